//! ARGO catalog database using SQLite.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use argo_common::NormalizedRecord;

use crate::error::{StorageError, StorageResult};
use crate::mapper;
use crate::schema::{seed_vocabularies, SCHEMA_SQL};
use crate::snapshot::Snapshot;
use crate::summary::MapSummary;

/// Connection settings for a file-backed catalog.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Database connection pool and write entry point.
///
/// SQLite admits one writer at a time, so writers queue on an in-process
/// gate before opening their transaction; readers are not gated.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl Catalog {
    /// Open or create the catalog database at the given path and apply
    /// the schema.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with(path, &CatalogOptions::default()).await
    }

    pub async fn open_with(path: &Path, options: &CatalogOptions) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect)
            .await?;

        let catalog = Self::from_pool(pool);
        catalog.migrate().await?;

        info!(path = %path.display(), "Opened ARGO catalog database");

        Ok(catalog)
    }

    /// Open an in-memory database (for testing).
    ///
    /// The single connection is never recycled, since closing it would
    /// discard the database.
    pub async fn open_memory() -> StorageResult<Self> {
        let connect = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect)
            .await?;

        let catalog = Self::from_pool(pool);
        catalog.migrate().await?;
        Ok(catalog)
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Run database migrations and seed the reference vocabularies.
    pub async fn migrate(&self) -> StorageResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
            }
        }

        seed_vocabularies(&self.pool).await
    }

    /// Start the transaction that will hold every write for one file.
    ///
    /// The transaction takes the database write lock up front, so a writer
    /// in another process makes this wait (up to the busy timeout) instead
    /// of failing a later statement. Dropping the returned value without
    /// calling [`FileTransaction::commit`] rolls everything back.
    pub async fn begin(&self) -> StorageResult<FileTransaction> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(FileTransaction {
            tx,
            summary: MapSummary::default(),
            _gate: gate,
        })
    }

    /// Read-only queries over committed rows.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// All writes for one input file.
pub struct FileTransaction {
    tx: Transaction<'static, Sqlite>,
    summary: MapSummary,
    _gate: OwnedMutexGuard<()>,
}

impl FileTransaction {
    /// Map one normalized record onto the schema.
    pub async fn apply(&mut self, record: &NormalizedRecord) -> StorageResult<()> {
        let conn = &mut *self.tx;
        match record {
            NormalizedRecord::Metadata(meta) => {
                let outcome = mapper::upsert_float(conn, meta).await?;
                self.summary.record_float(outcome);
            }
            NormalizedRecord::Profile(profile) => {
                let (outcome, levels) = mapper::upsert_cycle(conn, profile).await?;
                self.summary.record_cycle(outcome, levels);
            }
            NormalizedRecord::Trajectory(trajectory) => {
                let written = mapper::insert_trajectory(conn, trajectory).await?;
                self.summary.trajectory_points_inserted += written.points_inserted;
                self.summary.trajectory_points_existing += written.points_existing;
                self.summary.trajectory_cycles_written += written.cycles_written;
                self.summary.trajectory_measurements_written += written.measurements_written;
                self.summary.history_written += written.history_written;
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> &MapSummary {
        &self.summary
    }

    pub async fn commit(self) -> StorageResult<MapSummary> {
        self.tx.commit().await?;
        debug!(summary = ?self.summary, "Committed file transaction");
        Ok(self.summary)
    }

    pub async fn rollback(self) -> StorageResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
