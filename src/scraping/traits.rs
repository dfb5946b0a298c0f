//! Scraper capability traits

use crate::scraping::RawRepository;
use crate::storage::StorageError;
use crate::url::SourceUrl;
use std::future::Future;
use thiserror::Error;

/// Errors reported by a scraper
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No further pages exist for this source
    #[error("source has no more pages")]
    Exhausted,

    /// The current page could not be fetched or parsed; retrying re-attempts the same page
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The source is not something this scraper can enumerate
    #[error("invalid source {url}: {reason}")]
    Invalid { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Pagination over one index site
pub trait Scraper: Send {
    /// The source this scraper enumerates
    fn source(&self) -> &SourceUrl;

    /// Performs the first page fetch and reports whether the source is usable
    ///
    /// Must not touch the durable registries. A successful call keeps the
    /// fetched page so the following [`next`](Scraper::next) serves it without
    /// fetching again.
    fn validate_first_fetch(&mut self) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Returns the next repository not yet delivered
    ///
    /// Returns [`ScrapeError::Exhausted`] once the last page has been consumed.
    /// On [`ScrapeError::FetchFailed`] the cursor stays on the failed page.
    fn next(&mut self) -> impl Future<Output = Result<RawRepository, ScrapeError>> + Send;
}

/// Creates one scraper per source
pub trait ScraperFactory: Send + Sync {
    type Scraper: Scraper;

    fn create(&self, source: &SourceUrl) -> Self::Scraper;
}
