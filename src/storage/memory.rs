//! In-memory storage implementation
//!
//! Same semantics as [`SqliteStorage`](super::SqliteStorage) without
//! durability. Used by tests.

use crate::scraping::RawRepository;
use crate::storage::traits::{
    DeliveredRepositorySet, KnownSourceRegistry, Storage, StorageError, StorageResult,
};
use crate::storage::{RunRecord, RunStatus};
use crate::url::SourceUrl;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInner {
    sources: Vec<SourceUrl>,
    source_keys: HashSet<String>,
    delivered: HashMap<String, String>,
    runs: Vec<RunRecord>,
}

/// Volatile storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned storage mutex");
            poisoned.into_inner()
        })
    }
}

impl KnownSourceRegistry for MemoryStorage {
    fn contains_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        Ok(self.lock().source_keys.contains(source.key()))
    }

    fn add_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        let mut inner = self.lock();
        if !inner.source_keys.insert(source.key().to_string()) {
            return Ok(false);
        }
        inner.sources.push(source.clone());
        Ok(true)
    }

    fn all_known_sources(&self) -> StorageResult<Vec<SourceUrl>> {
        Ok(self.lock().sources.clone())
    }
}

impl DeliveredRepositorySet for MemoryStorage {
    fn contains_repository(&self, url: &str) -> StorageResult<bool> {
        Ok(self.lock().delivered.contains_key(url))
    }

    fn add_repository(&self, repository: &RawRepository) -> StorageResult<bool> {
        let mut inner = self.lock();
        if inner.delivered.contains_key(&repository.url) {
            return Ok(false);
        }
        inner.delivered.insert(
            repository.url.clone(),
            repository.source.key().to_string(),
        );
        Ok(true)
    }
}

impl Storage for MemoryStorage {
    fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let mut inner = self.lock();
        let id = inner.runs.len() as i64 + 1;
        inner.runs.push(RunRecord {
            id,
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            delivered_count: 0,
        });
        Ok(id)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.lock()
            .runs
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self.lock().runs.last().cloned())
    }

    fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        delivered_count: u64,
    ) -> StorageResult<()> {
        let mut inner = self.lock();
        let run = inner
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.status = status;
        run.finished_at = Some(Utc::now().to_rfc3339());
        run.delivered_count = delivered_count;
        Ok(())
    }

    fn count_known_sources(&self) -> StorageResult<u64> {
        Ok(self.lock().sources.len() as u64)
    }

    fn count_delivered_repositories(&self) -> StorageResult<u64> {
        Ok(self.lock().delivered.len() as u64)
    }

    fn delivered_by_source(&self) -> StorageResult<Vec<(String, u64)>> {
        let inner = self.lock();

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for key in inner.delivered.values() {
            *counts.entry(key.as_str()).or_insert(0) += 1;
        }

        let mut breakdown: Vec<(String, u64)> = counts
            .into_iter()
            .map(|(key, count)| {
                let url = inner
                    .sources
                    .iter()
                    .find(|source| source.key() == key)
                    .map(|source| source.as_str().to_string())
                    .unwrap_or_else(|| key.to_string());
                (url, count)
            })
            .collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(breakdown)
    }
}
