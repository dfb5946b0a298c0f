//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the registry and
//! storage traits. The connection sits behind a mutex so that one storage
//! value can be shared by the provider and every scraper it creates.

use crate::scraping::RawRepository;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    DeliveredRepositorySet, KnownSourceRegistry, Storage, StorageError, StorageResult,
};
use crate::storage::{RunRecord, RunStatus};
use crate::url::SourceUrl;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL lets several runner processes share one database file
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquires the connection, recovering from poison if necessary.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned storage mutex");
            poisoned.into_inner()
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Interrupted),
        delivered_count: row.get::<_, i64>(5)? as u64,
    })
}

impl KnownSourceRegistry for SqliteStorage {
    fn contains_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT id FROM known_sources WHERE source_key = ?1",
                params![source.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn add_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO known_sources (source_key, url, discovered_at) VALUES (?1, ?2, ?3)",
            params![source.key(), source.as_str(), now],
        )?;
        Ok(inserted > 0)
    }

    fn all_known_sources(&self) -> StorageResult<Vec<SourceUrl>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT url FROM known_sources ORDER BY id ASC")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        urls.iter()
            .map(|url| {
                SourceUrl::parse(url)
                    .map_err(|e| StorageError::Corrupt(format!("known source '{}': {}", url, e)))
            })
            .collect()
    }
}

impl DeliveredRepositorySet for SqliteStorage {
    fn contains_repository(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT id FROM delivered_repositories WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn add_repository(&self, repository: &RawRepository) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO delivered_repositories (url, source_key, name, description, delivered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                repository.url,
                repository.source.key(),
                repository.name,
                repository.description,
                now
            ],
        )?;
        Ok(inserted > 0)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn()
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, delivered_count
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn()
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, delivered_count
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        delivered_count: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn().execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, delivered_count = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, delivered_count as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Statistics =====

    fn count_known_sources(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM known_sources", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_delivered_repositories(&self) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM delivered_repositories",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delivered_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(k.url, d.source_key), COUNT(*) AS count
             FROM delivered_repositories d
             LEFT JOIN known_sources k ON k.source_key = d.source_key
             GROUP BY d.source_key
             ORDER BY count DESC, d.source_key ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
