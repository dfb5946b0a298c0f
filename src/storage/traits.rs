//! Storage traits and error types
//!
//! The provider only needs the two registry traits. [`Storage`] adds the
//! run bookkeeping and statistics used by the command-line runner.

use crate::scraping::RawRepository;
use crate::storage::{RunRecord, RunStatus};
use crate::url::SourceUrl;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, append-only set of validated source sites
///
/// Implementations must make `add_source` atomic per source so that two
/// providers sharing a store cannot both register the same site.
pub trait KnownSourceRegistry: Send + Sync {
    /// Checks whether a source has already been validated
    fn contains_source(&self, source: &SourceUrl) -> StorageResult<bool>;

    /// Registers a source; returns `true` if it was not known before
    fn add_source(&self, source: &SourceUrl) -> StorageResult<bool>;

    /// Returns every known source in registration order
    fn all_known_sources(&self) -> StorageResult<Vec<SourceUrl>>;
}

/// Durable, append-only set of repository URLs that were acknowledged
pub trait DeliveredRepositorySet: Send + Sync {
    /// Checks whether a repository URL was ever delivered
    fn contains_repository(&self, url: &str) -> StorageResult<bool>;

    /// Records a delivered repository; returns `true` if it was not recorded before
    fn add_repository(&self, repository: &RawRepository) -> StorageResult<bool>;
}

/// Full storage backend used by the runner
pub trait Storage: KnownSourceRegistry + DeliveredRepositorySet {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    fn create_run(&self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status and delivery count
    fn finish_run(&self, run_id: i64, status: RunStatus, delivered_count: u64)
        -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts validated sources
    fn count_known_sources(&self) -> StorageResult<u64>;

    /// Counts delivered repositories
    fn count_delivered_repositories(&self) -> StorageResult<u64>;

    /// Delivered repository counts per source URL, largest first
    fn delivered_by_source(&self) -> StorageResult<Vec<(String, u64)>>;
}
