//! Dataset version records.
//!
//! One row per dataset in `dataset_versions`. A dataset with no row has
//! never been loaded; the startup sequence writes the row only after the
//! dataset's contents have been replaced, inside the same transaction.

use chrono::{DateTime, Utc};
use duckdb::Connection;
use precinct_map_database_models::{DatasetKey, DatasetVersion, VersionOrdering};

use crate::DbError;

/// Environment variable selecting the [`VersionOrdering`] used at startup.
pub const VERSION_ORDERING_ENV: &str = "PRECINCT_MAP_VERSION_ORDERING";

/// Reads the version ordering from [`VERSION_ORDERING_ENV`].
///
/// Unset or unrecognized values fall back to [`VersionOrdering::Semantic`].
#[must_use]
pub fn ordering_from_env() -> VersionOrdering {
    std::env::var(VERSION_ORDERING_ENV).map_or_else(|_| VersionOrdering::default(), |raw| {
        parse_ordering(&raw)
    })
}

fn parse_ordering(raw: &str) -> VersionOrdering {
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!(
            "Ignoring {VERSION_ORDERING_ENV}={raw:?}; using {}",
            VersionOrdering::default()
        );
        VersionOrdering::default()
    })
}

/// Returns the recorded version of `key`, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_version(conn: &Connection, key: DatasetKey) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT version FROM dataset_versions WHERE dataset_key = ?")?;
    let result = stmt.query_row([key.as_ref()], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Returns the full version record of `key`, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored timestamp is not
/// RFC 3339.
pub fn get_record(conn: &Connection, key: DatasetKey) -> Result<Option<DatasetVersion>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT version, last_synced_at FROM dataset_versions WHERE dataset_key = ?",
    )?;
    let result = stmt.query_row([key.as_ref()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    });

    match result {
        Ok((version, synced)) => Ok(Some(DatasetVersion {
            key,
            version,
            last_synced_at: parse_timestamp(&synced)?,
        })),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Records `version` for `key`, replacing any previous record.
///
/// Recording the same version again is allowed and refreshes the
/// timestamp.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn record_version(
    conn: &Connection,
    key: DatasetKey,
    version: &str,
    synced_at: DateTime<Utc>,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO dataset_versions (dataset_key, version, last_synced_at) VALUES (?, ?, ?)
         ON CONFLICT (dataset_key) DO UPDATE SET
             version = EXCLUDED.version,
             last_synced_at = EXCLUDED.last_synced_at",
        duckdb::params![key.as_ref(), version, synced_at.to_rfc3339()],
    )?;
    log::debug!("Recorded {key} version {version}");
    Ok(())
}

/// Removes the version record of `key`, so it counts as never loaded.
///
/// Returns whether a record existed.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub fn clear_version(conn: &Connection, key: DatasetKey) -> Result<bool, DbError> {
    let removed = conn.execute(
        "DELETE FROM dataset_versions WHERE dataset_key = ?",
        [key.as_ref()],
    )?;
    Ok(removed > 0)
}

/// Whether `key` must be reseeded to reach `target`.
///
/// # Errors
///
/// Returns [`DbError`] if the recorded version cannot be read.
pub fn needs_upgrade(
    conn: &Connection,
    key: DatasetKey,
    target: &str,
    ordering: VersionOrdering,
) -> Result<bool, DbError> {
    let current = get_version(conn, key)?;
    Ok(key.needs_upgrade(current.as_deref(), target, ordering))
}

/// Returns the datasets in `required` that have no recorded version.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn missing_keys(conn: &Connection, required: &[DatasetKey]) -> Result<Vec<DatasetKey>, DbError> {
    let mut missing = Vec::new();
    for &key in required {
        if get_version(conn, key)?.is_none() {
            missing.push(key);
        }
    }
    Ok(missing)
}

/// Whether every dataset in `required` has been loaded at least once.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn is_initial_load_complete(conn: &Connection, required: &[DatasetKey]) -> Result<bool, DbError> {
    Ok(missing_keys(conn, required)?.is_empty())
}

/// Lists every recorded dataset version, ordered by key.
///
/// Rows with an unrecognized key are skipped with a warning.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a timestamp is malformed.
pub fn list_versions(conn: &Connection) -> Result<Vec<DatasetVersion>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT dataset_key, version, last_synced_at FROM dataset_versions ORDER BY dataset_key",
    )?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let raw_key: String = row.get(0)?;
        let version: String = row.get(1)?;
        let synced: String = row.get(2)?;

        let Ok(key) = raw_key.parse::<DatasetKey>() else {
            log::warn!("Skipping version record for unknown dataset {raw_key:?}");
            continue;
        };

        records.push(DatasetVersion {
            key,
            version,
            last_synced_at: parse_timestamp(&synced)?,
        });
    }

    Ok(records)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("invalid last_synced_at {raw:?}: {e}"),
        })
}
