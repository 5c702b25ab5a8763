#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seeding of the local dataset store.
//!
//! A TOML seed manifest names each dataset, the version shipped with the
//! application, and the file it is loaded from. At startup every dataset
//! whose recorded version is missing or older is replaced inside a single
//! transaction; the new version is recorded only once its rows are in
//! place, so an interrupted reseed is redone on the next startup.

pub mod manifest;
pub mod source;
pub mod upgrade;

use std::path::PathBuf;

use precinct_map_database::DbError;
use precinct_map_database_models::DatasetKey;
use precinct_map_geography::GeoError;

pub use manifest::{DatasetEntry, SeedManifest, SubZoneDerivation};
pub use source::{DatasetPayload, DatasetSource, DerivedSubZones, FileSource};
pub use upgrade::{StartupReport, UpgradeOutcome, run_startup, upgrade_dataset};

/// Errors that can occur while seeding datasets.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Dataset store error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// A seed file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A seed file is not valid JSON or has the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Boundary data could not be normalized or split.
    #[error("Geography error: {0}")]
    Geography(#[from] GeoError),

    /// A seed file produced no usable rows.
    #[error("Dataset {key} has no usable rows")]
    EmptyDataset {
        /// Dataset being loaded.
        key: DatasetKey,
    },

    /// A source returned rows for a different dataset than it declared.
    #[error("Source for {expected} produced {actual} rows")]
    PayloadMismatch {
        /// Dataset the source declared.
        expected: DatasetKey,
        /// Dataset the payload belongs to.
        actual: DatasetKey,
    },

    /// The seed manifest is not valid TOML.
    #[error("Invalid seed manifest: {0}")]
    ManifestToml(#[from] toml::de::Error),

    /// The seed manifest is well-formed but inconsistent.
    #[error("Invalid seed manifest: {message}")]
    Manifest {
        /// Description of what went wrong.
        message: String,
    },
}

impl IngestError {
    /// Whether the failure should be retried at the next startup.
    ///
    /// Failures while reading, parsing or writing a dataset are retryable:
    /// the previous version stays recorded and the next run reseeds from
    /// scratch. Manifest and source wiring mistakes are not; retrying
    /// cannot fix them.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_)
            | Self::Io { .. }
            | Self::Json(_)
            | Self::Geography(_)
            | Self::EmptyDataset { .. } => true,
            Self::PayloadMismatch { .. } | Self::ManifestToml(_) | Self::Manifest { .. } => false,
        }
    }
}
