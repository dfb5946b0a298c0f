//! Candidate source discovery
//!
//! A [`Searcher`] turns a query into candidate index-site URLs. Results are
//! raw strings: duplicates, already-known sites and garbage are all allowed,
//! the provider normalizes and filters them.

mod web;

pub use web::{site_base, WebSearcher};

use std::future::Future;
use thiserror::Error;

/// Errors that can occur while searching
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search endpoint returned HTTP {0}")]
    Status(u16),
}

/// Source of candidate index-site URLs
pub trait Searcher: Send + Sync {
    /// Returns candidate URLs for `query`; an empty list is a valid answer
    fn search(&self, query: &str)
        -> impl Future<Output = Result<Vec<String>, SearchError>> + Send;
}

/// Returns a fixed list of candidates regardless of the query
#[derive(Debug, Clone, Default)]
pub struct SeedSearcher {
    seeds: Vec<String>,
}

impl SeedSearcher {
    pub fn new(seeds: Vec<String>) -> Self {
        Self { seeds }
    }
}

impl Searcher for SeedSearcher {
    async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
        Ok(self.seeds.clone())
    }
}

/// Finds nothing; discovery then relies on the known-source registry alone
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSearcher;

impl Searcher for NullSearcher {
    async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
        Ok(Vec::new())
    }
}

/// Concatenates the results of two searchers
///
/// A failing side is logged and skipped; the search only fails when both do.
#[derive(Debug, Clone, Default)]
pub struct CompositeSearcher<A, B> {
    first: A,
    second: B,
}

impl<A: Searcher, B: Searcher> CompositeSearcher<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Searcher, B: Searcher> Searcher for CompositeSearcher<A, B> {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let first = self.first.search(query).await;
        let second = self.second.search(query).await;

        match (first, second) {
            (Ok(mut a), Ok(b)) => {
                a.extend(b);
                Ok(a)
            }
            (Ok(found), Err(e)) | (Err(e), Ok(found)) => {
                tracing::warn!(error = %e, "Searcher failed, using partial results");
                Ok(found)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }
}
