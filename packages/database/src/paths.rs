#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` dataset file.
//!
//! Defaults live under the project root's `data/` directory and can be
//! overridden with `PRECINCT_MAP_DB`.

use std::path::{Path, PathBuf};

/// Environment variable overriding [`default_db_path`].
pub const DB_PATH_ENV: &str = "PRECINCT_MAP_DB";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// manifest directory itself if it has fewer ancestors than expected.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default dataset `DuckDB` path.
#[must_use]
pub fn default_db_path() -> PathBuf {
    data_dir().join("precinct_map.duckdb")
}

/// Returns the dataset `DuckDB` path, honoring [`DB_PATH_ENV`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var(DB_PATH_ENV).map_or_else(|_| default_db_path(), PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
