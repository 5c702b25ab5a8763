//! Dataset store lifecycle.
//!
//! The store moves `Open -> Ready -> Closed`. It is `Open` once the schema
//! exists, `Ready` once every required dataset has a recorded version, and
//! `Closed` after [`DatasetStore::close`]; every access after that fails
//! with [`DbError::Closed`].

use std::path::Path;

use duckdb::Connection;
use precinct_map_database_models::DatasetKey;

use crate::{DbError, versions};

/// Lifecycle state of a [`DatasetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Schema exists; datasets may still be missing or stale.
    Open,
    /// Every required dataset has been loaded at least once.
    Ready,
    /// Connection dropped; no further access is possible.
    Closed,
}

/// Owns the `DuckDB` connection holding all seeded datasets.
#[derive(Debug)]
pub struct DatasetStore {
    conn: Option<Connection>,
    state: StoreState,
}

impl DatasetStore {
    /// Opens (or creates) the dataset `DuckDB` at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the parent directory cannot be created, or
    /// the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::paths::ensure_dir(parent)?;
        }

        log::debug!("Opening dataset store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens the store at [`crate::paths::db_path_from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_default() -> Result<Self, DbError> {
        Self::open(&crate::paths::db_path_from_env())
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch("SET threads = 4;")?;
        create_schema(&conn)?;

        Ok(Self {
            conn: Some(conn),
            state: StoreState::Open,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> StoreState {
        self.state
    }

    /// Whether every required dataset was present at the last
    /// [`DatasetStore::mark_ready`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == StoreState::Ready
    }

    /// Borrows the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Closed`] after [`DatasetStore::close`].
    pub fn connection(&self) -> Result<&Connection, DbError> {
        self.conn.as_ref().ok_or(DbError::Closed)
    }

    /// Moves the store to [`StoreState::Ready`] if every dataset in
    /// `required` has a recorded version.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotReady`] naming the datasets never loaded (the
    /// state is left unchanged), or [`DbError::Closed`].
    pub fn mark_ready(&mut self, required: &[DatasetKey]) -> Result<(), DbError> {
        let missing = versions::missing_keys(self.connection()?, required)?;

        if !missing.is_empty() {
            log::warn!("Dataset store not ready; missing {missing:?}");
            return Err(DbError::NotReady { missing });
        }

        if self.state != StoreState::Ready {
            log::info!("Dataset store ready ({} datasets)", required.len());
        }
        self.state = StoreState::Ready;
        Ok(())
    }

    /// Runs `f` inside a single transaction.
    ///
    /// Commits when `f` succeeds; rolls back and returns `f`'s error
    /// otherwise, leaving the previous contents untouched.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or [`DbError`] (converted into `E`) if the
    /// store is closed or the transaction cannot begin or commit.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN TRANSACTION;")
            .map_err(DbError::from)?;

        match f(conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT;").map_err(DbError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = conn.execute_batch("ROLLBACK;") {
                    log::error!("Rollback failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    /// Closes the connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuckDb`] if `DuckDB` fails to close cleanly; the
    /// store is `Closed` either way.
    pub fn close(&mut self) -> Result<(), DbError> {
        self.state = StoreState::Closed;

        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        log::debug!("Closing dataset store");
        conn.close().map_err(|(_, e)| DbError::DuckDb(e))
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS zones (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            phone TEXT,
            hours_json TEXT NOT NULL,
            boundary_geojson TEXT NOT NULL,
            min_lat DOUBLE NOT NULL,
            min_lng DOUBLE NOT NULL,
            max_lat DOUBLE NOT NULL,
            max_lng DOUBLE NOT NULL,
            centroid_lat DOUBLE NOT NULL,
            centroid_lng DOUBLE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sub_zones (
            id TEXT NOT NULL,
            zone_id BIGINT NOT NULL,
            boundary_geojson TEXT NOT NULL,
            min_lat DOUBLE NOT NULL,
            min_lng DOUBLE NOT NULL,
            max_lat DOUBLE NOT NULL,
            max_lng DOUBLE NOT NULL,
            PRIMARY KEY (zone_id, id)
        );

        CREATE TABLE IF NOT EXISTS law_articles (
            id TEXT PRIMARY KEY,
            chapter TEXT,
            title TEXT NOT NULL,
            body TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dataset_versions (
            dataset_key TEXT PRIMARY KEY,
            version TEXT NOT NULL,
            last_synced_at TEXT NOT NULL
        );",
    )?;

    Ok(())
}
