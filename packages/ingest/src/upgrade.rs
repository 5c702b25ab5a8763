//! Transactional dataset upgrades.
//!
//! For each dataset: compare the recorded version with the source's
//! version, and if an upgrade is needed delete the old rows, insert the new
//! ones and record the new version, all in one transaction. A failure at
//! any step rolls back, so the old rows and the old version survive and
//! the next startup tries again.
//!
//! Replacing a dataset also clears the rows and version of every dataset
//! that references it (sub-zones reference zones), so those are reloaded
//! against the new rows instead of pointing at zones that no longer exist.

use chrono::Utc;
use duckdb::Connection;
use precinct_map_database::{DatasetStore, DbError, library_db, versions, zones_db};
use precinct_map_database_models::{DatasetKey, VersionOrdering};

use crate::IngestError;
use crate::manifest::SeedManifest;
use crate::source::{DatasetPayload, DatasetSource};

/// What [`upgrade_dataset`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The recorded version already satisfies the source.
    UpToDate {
        /// Dataset checked.
        key: DatasetKey,
        /// Recorded version.
        version: String,
    },
    /// The dataset was replaced.
    Upgraded {
        /// Dataset replaced.
        key: DatasetKey,
        /// Previously recorded version, if any.
        from: Option<String>,
        /// Newly recorded version.
        to: String,
        /// Rows inserted.
        rows: u64,
    },
}

impl UpgradeOutcome {
    /// Dataset this outcome is about.
    #[must_use]
    pub const fn key(&self) -> DatasetKey {
        match self {
            Self::UpToDate { key, .. } | Self::Upgraded { key, .. } => *key,
        }
    }
}

/// Upgrades one dataset if its recorded version is missing or older than
/// `source.version()` under `ordering`.
///
/// # Errors
///
/// Returns [`IngestError`] if the source fails to load or any write fails.
/// The transaction is rolled back first, leaving the previous rows and
/// version in place.
pub fn upgrade_dataset(
    store: &DatasetStore,
    source: &dyn DatasetSource,
    ordering: VersionOrdering,
) -> Result<UpgradeOutcome, IngestError> {
    let key = source.key();
    let target = source.version();
    let current = versions::get_version(store.connection()?, key)?;

    if !key.needs_upgrade(current.as_deref(), target, ordering) {
        log::info!(
            "{key}: up to date at {} (shipped {target})",
            current.as_deref().unwrap_or_default()
        );
        return Ok(UpgradeOutcome::UpToDate {
            key,
            version: current.unwrap_or_default(),
        });
    }

    log::info!(
        "{key}: upgrading {} -> {target}",
        current.as_deref().unwrap_or("(none)")
    );

    let result = store.with_transaction(|conn| {
        let payload = source.load(conn)?;
        if payload.key() != key {
            return Err(IngestError::PayloadMismatch {
                expected: key,
                actual: payload.key(),
            });
        }

        delete_rows(conn, key)?;
        invalidate_dependents(conn, key)?;
        let rows = insert_rows(conn, &payload)?;
        versions::record_version(conn, key, target, Utc::now())?;

        Ok(rows)
    });

    match result {
        Ok(rows) => {
            log::info!("{key}: upgraded to {target} ({rows} rows)");
            Ok(UpgradeOutcome::Upgraded {
                key,
                from: current,
                to: target.to_string(),
                rows,
            })
        }
        Err(e) => {
            log::error!(
                "{key}: upgrade to {target} failed, keeping {}: {e}",
                current.as_deref().unwrap_or("(none)")
            );
            Err(e)
        }
    }
}

fn delete_rows(conn: &Connection, key: DatasetKey) -> Result<usize, DbError> {
    match key {
        DatasetKey::Zones => zones_db::delete_zones(conn),
        DatasetKey::SubZones => zones_db::delete_sub_zones(conn),
        DatasetKey::LawLibrary => library_db::delete_articles(conn),
    }
}

fn invalidate_dependents(conn: &Connection, key: DatasetKey) -> Result<(), DbError> {
    for &dependent in key.dependents() {
        let rows = delete_rows(conn, dependent)?;
        if versions::clear_version(conn, dependent)? || rows > 0 {
            log::info!("{key} replaced; {dependent} will be reloaded ({rows} rows dropped)");
        }
    }
    Ok(())
}

fn insert_rows(conn: &Connection, payload: &DatasetPayload) -> Result<u64, DbError> {
    match payload {
        DatasetPayload::Zones(zones) => zones_db::insert_zones(conn, zones),
        DatasetPayload::SubZones(sub_zones) => zones_db::insert_sub_zones(conn, sub_zones),
        DatasetPayload::LawArticles(articles) => library_db::insert_articles(conn, articles),
    }
}

/// Result of [`run_startup`].
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Outcomes of datasets that upgraded or were already current.
    pub outcomes: Vec<UpgradeOutcome>,
    /// Datasets whose upgrade failed, with the error.
    pub failures: Vec<(DatasetKey, IngestError)>,
    /// Whether the store reached [`precinct_map_database::StoreState::Ready`].
    pub ready: bool,
}

impl StartupReport {
    /// Whether every dataset upgraded or was already current.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether any failure should be retried at the next startup.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.failures.iter().any(|(_, e)| e.is_retryable())
    }
}

/// Upgrades every dataset in `manifest`, then marks the store ready if
/// every dataset it names has been loaded at least once.
///
/// A failing dataset does not stop the others; its error is collected in
/// the report.
///
/// # Errors
///
/// Returns [`IngestError`] only if the store itself is unusable (closed).
pub fn run_startup(
    store: &mut DatasetStore,
    manifest: &SeedManifest,
    ordering: VersionOrdering,
) -> Result<StartupReport, IngestError> {
    let mut report = StartupReport::default();

    for source in manifest.sources() {
        match upgrade_dataset(store, source.as_ref(), ordering) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => report.failures.push((source.key(), e)),
        }
    }

    let required = manifest.dataset_keys();
    match store.mark_ready(&required) {
        Ok(()) => report.ready = true,
        Err(DbError::NotReady { missing }) => {
            log::warn!("Datasets never loaded: {missing:?}; will retry next startup");
        }
        Err(e) => return Err(e.into()),
    }

    if !report.is_clean() {
        log::warn!(
            "{} of {} datasets failed to upgrade",
            report.failures.len(),
            required.len()
        );
    }

    Ok(report)
}
