//! Seed manifest.
//!
//! ```toml
//! [[datasets]]
//! key = "zones"
//! version = "2.1.0"
//! path = "zones.geojson"
//!
//! [[datasets]]
//! key = "law_library"
//! version = "7"
//! path = "law_articles.json"
//!
//! [sub_zones]
//! derive = "principal_axis"
//! version = "2.1.0"
//! ```
//!
//! Paths are relative to the manifest file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use precinct_map_database_models::DatasetKey;
use precinct_map_geography::SplitStrategy;
use serde::{Deserialize, Serialize};

use crate::IngestError;
use crate::source::{DatasetSource, DerivedSubZones, FileSource};

/// One file-backed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Dataset this file seeds.
    pub key: DatasetKey,
    /// Version shipped with the application.
    pub version: String,
    /// Seed file, relative to the manifest.
    pub path: PathBuf,
}

/// Sub-zones derived by splitting stored zones instead of loading a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubZoneDerivation {
    /// Split strategy.
    #[serde(default)]
    pub derive: SplitStrategy,
    /// Version recorded for the derived dataset.
    pub version: String,
}

/// Parsed seed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedManifest {
    /// File-backed datasets.
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
    /// Derived sub-zones, used when no sub-zone file is listed.
    #[serde(default)]
    pub sub_zones: Option<SubZoneDerivation>,
    /// Directory that relative paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SeedManifest {
    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&text, base_dir)
    }

    /// Parses and validates manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ManifestToml`] for malformed TOML and
    /// [`IngestError::Manifest`] for duplicate datasets, an empty
    /// version, or sub-zones given both as a file and as a derivation.
    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let mut manifest: Self = toml::de::from_str(text)?;
        manifest.base_dir = base_dir.into();
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), IngestError> {
        let invalid = |message: String| Err(IngestError::Manifest { message });

        let mut seen = BTreeSet::new();
        for entry in &self.datasets {
            if !seen.insert(entry.key) {
                return invalid(format!("dataset {} is listed more than once", entry.key));
            }
            if entry.version.trim().is_empty() {
                return invalid(format!("dataset {} has an empty version", entry.key));
            }
        }

        if let Some(derivation) = &self.sub_zones {
            if seen.contains(&DatasetKey::SubZones) {
                return invalid(
                    "sub_zones is both listed as a dataset and derived".to_string(),
                );
            }
            if !seen.contains(&DatasetKey::Zones) {
                return invalid("derived sub_zones need a zones dataset".to_string());
            }
            if derivation.version.trim().is_empty() {
                return invalid("derived sub_zones have an empty version".to_string());
            }
        }

        Ok(())
    }

    /// Every dataset the manifest seeds, in [`DatasetKey::ALL`] order.
    #[must_use]
    pub fn dataset_keys(&self) -> Vec<DatasetKey> {
        DatasetKey::ALL
            .iter()
            .copied()
            .filter(|key| {
                self.datasets.iter().any(|e| e.key == *key)
                    || (*key == DatasetKey::SubZones && self.sub_zones.is_some())
            })
            .collect()
    }

    /// Builds the sources to seed from, zones before sub-zones.
    #[must_use]
    pub fn sources(&self) -> Vec<Box<dyn DatasetSource>> {
        let mut sources: Vec<Box<dyn DatasetSource>> = Vec::new();

        for key in self.dataset_keys() {
            if let Some(entry) = self.datasets.iter().find(|e| e.key == key) {
                sources.push(Box::new(FileSource::new(
                    entry.key,
                    entry.version.clone(),
                    self.base_dir.join(&entry.path),
                )));
            } else if let Some(derivation) = &self.sub_zones {
                sources.push(Box::new(DerivedSubZones::new(
                    derivation.version.clone(),
                    derivation.derive,
                )));
            }
        }

        sources
    }
}
