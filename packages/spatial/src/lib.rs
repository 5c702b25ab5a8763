#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory zone snapshot and point-to-zone resolution.
//!
//! Loads zone and sub-zone boundaries from the dataset store once the
//! store is ready, then answers "which precinct (and sector) contains this
//! point" with a linear bounding-box + ray-casting scan. Points that fall
//! in gaps between boundaries fall back to the nearest zone centroid within
//! a configurable distance.

pub mod resolver;

use precinct_map_database::{DatasetStore, DbError, versions, zones_db};
use precinct_map_database_models::DatasetKey;
use precinct_map_geography_models::{Point, SubZone, Zone};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

pub use resolver::{
    Region, ResolveStats, find_nearest, find_sub_zone, resolve_zone, resolve_zone_with_stats,
};

/// Default nearest-centroid threshold in squared degrees.
///
/// `0.0007` is a radius of about 0.0265 degrees: roughly 2.9 km north-south
/// and 2.2 km east-west at latitude 40.7. Points further than that from
/// every centroid stay unresolved.
pub const DEFAULT_NEAREST_MAX_SQ_DEG: f64 = 0.0007;

/// Datasets that must have been loaded before a [`ZoneIndex`] is built
/// from the store.
pub const REQUIRED_DATASETS: &[DatasetKey] = &[DatasetKey::Zones, DatasetKey::SubZones];

/// Environment variable overriding [`DEFAULT_NEAREST_MAX_SQ_DEG`].
pub const NEAREST_MAX_SQ_DEG_ENV: &str = "PRECINCT_MAP_NEAREST_MAX_SQ_DEG";

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Upper bound on the squared planar distance (degrees²) accepted by
    /// the nearest-centroid fallback.
    pub max_nearest_sq_distance: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_nearest_sq_distance: DEFAULT_NEAREST_MAX_SQ_DEG,
        }
    }
}

impl ResolverConfig {
    /// Reads the threshold from [`NEAREST_MAX_SQ_DEG_ENV`], falling back to
    /// the default when unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let Ok(raw) = std::env::var(NEAREST_MAX_SQ_DEG_ENV) else {
            return Self::default();
        };

        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Self {
                max_nearest_sq_distance: value,
            },
            _ => {
                log::warn!(
                    "Ignoring {NEAREST_MAX_SQ_DEG_ENV}={raw:?}; using {DEFAULT_NEAREST_MAX_SQ_DEG}"
                );
                Self::default()
            }
        }
    }
}

/// How a location was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMethod {
    /// The point lies inside the zone boundary.
    Polygon,
    /// No boundary contained the point; the nearest centroid was within
    /// the configured threshold.
    Nearest,
}

/// The zone (and sector, when known) a point resolved to.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location<'a> {
    /// Resolved zone.
    pub zone: &'a Zone,
    /// Sector within the zone containing the point, if any.
    pub sub_zone: Option<&'a SubZone>,
    /// How the zone was chosen.
    pub method: MatchMethod,
}

/// Immutable snapshot of zones and sub-zones.
///
/// Built once after seeding and shared by readers; lookups never mutate it.
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    zones: Vec<Zone>,
    sub_zones: Vec<SubZone>,
    config: ResolverConfig,
}

impl ZoneIndex {
    /// Builds a snapshot from already-loaded data.
    #[must_use]
    pub const fn new(zones: Vec<Zone>, sub_zones: Vec<SubZone>, config: ResolverConfig) -> Self {
        Self {
            zones,
            sub_zones,
            config,
        }
    }

    /// Loads zones and sub-zones from the dataset store.
    ///
    /// Rows with malformed boundaries are skipped by the loader.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotReady`] if any of [`REQUIRED_DATASETS`] has
    /// never been loaded, or [`DbError`] if the store is closed or a query
    /// fails.
    pub fn load(store: &DatasetStore, config: ResolverConfig) -> Result<Self, DbError> {
        let conn = store.connection()?;

        let missing = versions::missing_keys(conn, REQUIRED_DATASETS)?;
        if !missing.is_empty() {
            return Err(DbError::NotReady { missing });
        }

        let zones = zones_db::load_zones(conn)?;
        log::info!("Loaded {} zones into zone index", zones.len());

        let sub_zones = zones_db::load_sub_zones(conn)?;
        log::info!("Loaded {} sub-zones into zone index", sub_zones.len());

        Ok(Self::new(zones, sub_zones, config))
    }

    /// All zones, in load order.
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// All sub-zones, in load order.
    #[must_use]
    pub fn sub_zones(&self) -> &[SubZone] {
        &self.sub_zones
    }

    /// Resolver configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Looks up a zone by id.
    #[must_use]
    pub fn zone(&self, id: i64) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Sub-zones belonging to `zone_id`.
    pub fn sub_zones_of(&self, zone_id: i64) -> impl Iterator<Item = &SubZone> {
        self.sub_zones.iter().filter(move |s| s.zone_id == zone_id)
    }

    /// Resolves a point to a zone and sector.
    ///
    /// Tries boundary containment first, then the nearest-centroid
    /// fallback; the sector is then searched among the chosen zone's
    /// sub-zones only. Returns `None` when the point is unresolved.
    #[must_use]
    pub fn locate(&self, point: Point) -> Option<Location<'_>> {
        let (zone, method) = match resolve_zone(point, &self.zones) {
            Some(zone) => (zone, MatchMethod::Polygon),
            None => {
                let zone = find_nearest(point, &self.zones, self.config.max_nearest_sq_distance)?;
                log::debug!(
                    "({}, {}) is outside every boundary; falling back to nearest zone {}",
                    point.lat,
                    point.lng,
                    zone.id
                );
                (zone, MatchMethod::Nearest)
            }
        };

        let sub_zone = find_sub_zone(point, &self.sub_zones, Some(zone.id));

        Some(Location {
            zone,
            sub_zone,
            method,
        })
    }
}
