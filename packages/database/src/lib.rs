#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` dataset store for precinct boundaries, sectors and the
//! reference-text library.
//!
//! A single `DuckDB` file holds every seeded dataset plus a
//! `dataset_versions` table recording which version of each dataset is
//! present. Geometry is stored as `GeoJSON` TEXT alongside precomputed
//! bounding boxes and centroids, so loading a zone never recomputes them.

pub mod library_db;
pub mod paths;
pub mod store;
pub mod versions;
pub mod zones_db;

use precinct_map_database_models::DatasetKey;
use precinct_map_geography_models::GeometryError;

pub use store::{DatasetStore, StoreState};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored geometry failed validation.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The store was used after [`DatasetStore::close`].
    #[error("Dataset store is closed")]
    Closed,

    /// The store cannot become ready because datasets have never been
    /// loaded.
    #[error("Dataset store is not ready; missing datasets: {missing:?}")]
    NotReady {
        /// Datasets with no recorded version.
        missing: Vec<DatasetKey>,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
