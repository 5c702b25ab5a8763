#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary geometry primitives, feature normalization and sub-zone
//! derivation.
//!
//! The primitives here are deliberately simple: bounding-box rejection,
//! crossing-number point-in-polygon over exterior rings, vertex-mean
//! centroids and min/max bounding boxes. Zone datasets are small (tens to
//! low hundreds of boundaries), so callers scan linearly.

pub mod normalize;
pub mod primitives;
pub mod split;

use thiserror::Error;

pub use primitives::{
    build_sub_zone, build_zone, compute_bounding_box, compute_centroid, geometry_bounding_box,
    geometry_centroid, point_in_bounding_box, point_in_polygon, point_in_ring,
};
pub use split::{SplitStrategy, derive_sub_zones};

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Boundary geometry failed validation.
    #[error("Geometry error: {0}")]
    Geometry(#[from] precinct_map_geography_models::GeometryError),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A geometry without any coordinates.
    #[error("Boundary for {id} has no coordinates")]
    EmptyGeometry {
        /// Zone or sub-zone identifier.
        id: String,
    },

    /// A zone boundary that cannot be split into sub-zones.
    #[error("Cannot split zone {zone_id}: {reason}")]
    CannotSplit {
        /// Zone identifier.
        zone_id: i64,
        /// Why the split was refused.
        reason: String,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
