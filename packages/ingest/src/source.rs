//! Dataset sources.
//!
//! A source knows which dataset it seeds, the version it provides, and how
//! to produce that dataset's rows. Sources load inside the upgrade
//! transaction, so a source that reads the store (sub-zone derivation)
//! sees the rows committed by earlier datasets.

use std::path::PathBuf;

use duckdb::Connection;
use precinct_map_database::zones_db;
use precinct_map_database_models::{DatasetKey, LawArticle};
use precinct_map_geography::normalize::{
    feature_collection, normalize_sub_zone_features, normalize_zone_features,
};
use precinct_map_geography::{GeoError, SplitStrategy, derive_sub_zones};
use precinct_map_geography_models::{SubZone, Zone};

use crate::IngestError;

/// Rows for one dataset, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetPayload {
    /// Zone boundaries.
    Zones(Vec<Zone>),
    /// Sector boundaries.
    SubZones(Vec<SubZone>),
    /// Reference-text articles.
    LawArticles(Vec<LawArticle>),
}

impl DatasetPayload {
    /// Dataset these rows belong to.
    #[must_use]
    pub const fn key(&self) -> DatasetKey {
        match self {
            Self::Zones(_) => DatasetKey::Zones,
            Self::SubZones(_) => DatasetKey::SubZones,
            Self::LawArticles(_) => DatasetKey::LawLibrary,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Zones(rows) => rows.len(),
            Self::SubZones(rows) => rows.len(),
            Self::LawArticles(rows) => rows.len(),
        }
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Something that can produce one dataset at one version.
pub trait DatasetSource {
    /// Dataset this source seeds.
    fn key(&self) -> DatasetKey;

    /// Version of the rows [`DatasetSource::load`] produces.
    fn version(&self) -> &str;

    /// Produces the dataset's rows.
    ///
    /// `conn` is the connection inside the upgrade transaction.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the rows cannot be produced.
    fn load(&self, conn: &Connection) -> Result<DatasetPayload, IngestError>;
}

/// Loads a dataset from a JSON file.
///
/// Zones and sub-zones are read from a `GeoJSON` `FeatureCollection`;
/// malformed features are skipped. Law articles are read from a JSON array.
#[derive(Debug, Clone)]
pub struct FileSource {
    key: DatasetKey,
    version: String,
    path: PathBuf,
}

impl FileSource {
    /// Creates a file source.
    #[must_use]
    pub const fn new(key: DatasetKey, version: String, path: PathBuf) -> Self {
        Self { key, version, path }
    }

    /// File the dataset is read from.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl DatasetSource for FileSource {
    fn key(&self) -> DatasetKey {
        self.key
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn load(&self, _conn: &Connection) -> Result<DatasetPayload, IngestError> {
        log::info!("Reading {} from {}", self.key, self.path.display());

        let text = std::fs::read_to_string(&self.path).map_err(|source| IngestError::Io {
            path: self.path.clone(),
            source,
        })?;

        let payload = parse_payload(self.key, &text)?;

        if payload.is_empty() {
            return Err(IngestError::EmptyDataset { key: self.key });
        }

        Ok(payload)
    }
}

/// Parses seed file contents for `key`.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not the expected JSON shape.
pub fn parse_payload(key: DatasetKey, text: &str) -> Result<DatasetPayload, IngestError> {
    match key {
        DatasetKey::Zones | DatasetKey::SubZones => {
            let value: serde_json::Value = serde_json::from_str(text)?;
            let features = feature_collection(&value)?;

            let payload = if key == DatasetKey::Zones {
                DatasetPayload::Zones(normalize_zone_features(features))
            } else {
                DatasetPayload::SubZones(normalize_sub_zone_features(features))
            };

            if payload.len() < features.len() {
                log::warn!(
                    "{key}: kept {} of {} features",
                    payload.len(),
                    features.len()
                );
            }

            Ok(payload)
        }
        DatasetKey::LawLibrary => Ok(DatasetPayload::LawArticles(serde_json::from_str(text)?)),
    }
}

/// Derives sub-zones by splitting every stored zone.
///
/// Zones that cannot be split are skipped with a warning.
#[derive(Debug, Clone)]
pub struct DerivedSubZones {
    version: String,
    strategy: SplitStrategy,
}

impl DerivedSubZones {
    /// Creates a derivation source.
    #[must_use]
    pub const fn new(version: String, strategy: SplitStrategy) -> Self {
        Self { version, strategy }
    }
}

impl DatasetSource for DerivedSubZones {
    fn key(&self) -> DatasetKey {
        DatasetKey::SubZones
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn load(&self, conn: &Connection) -> Result<DatasetPayload, IngestError> {
        let zones = zones_db::load_zones(conn)?;
        log::info!(
            "Deriving sub-zones for {} zones ({})",
            zones.len(),
            self.strategy
        );

        let mut sub_zones = Vec::with_capacity(zones.len() * 2);
        for zone in &zones {
            match derive_sub_zones(zone, self.strategy) {
                Ok(derived) => sub_zones.extend(derived),
                Err(e @ GeoError::CannotSplit { .. }) => log::warn!("{e}"),
                Err(e) => return Err(e.into()),
            }
        }

        if sub_zones.is_empty() {
            return Err(IngestError::EmptyDataset {
                key: DatasetKey::SubZones,
            });
        }

        Ok(DatasetPayload::SubZones(sub_zones))
    }
}
