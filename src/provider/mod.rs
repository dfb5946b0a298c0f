//! Discovery and delivery of repository records
//!
//! [`Provider`] turns an open-ended, possibly duplicated set of candidate
//! index sites into a deduplicated, retry-safe sequence of
//! [`RawRepository`] values through a pull/acknowledge protocol:
//!
//! ```text
//! loop {
//!     let repository = provider.next().await?;   // Eof when caught up
//!     let outcome = consume(&repository);
//!     provider.ack(outcome).await?;              // Failure replays the item
//! }
//! ```
//!
//! # Discovery
//!
//! Whenever the roster of scrapers is empty and an item is requested, the
//! searcher is queried and its results are merged with every source in the
//! known-source registry. Unknown candidates must pass a first fetch before
//! they are registered; candidates failing it are dropped for this cycle
//! without charging the backoff.
//!
//! # Delivery
//!
//! Scrapers are pulled round-robin. An exhausted scraper leaves the roster. A
//! failing one stays in place, is charged one backoff attempt, and the failure
//! is surfaced with the delay the caller should wait before asking again.

mod state;

pub use state::Ack;

use crate::backoff::{Backoff, BackoffConfig};
use crate::scraping::{RawRepository, ScrapeError, Scraper, ScraperFactory};
use crate::search::Searcher;
use crate::storage::{DeliveredRepositorySet, KnownSourceRegistry, StorageError};
use crate::url::SourceUrl;
use state::{ProviderState, Slot};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Outcomes of [`Provider::next`] other than a repository
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No sources remain and discovery found nothing new
    #[error("no sources left to scrape")]
    Eof,

    /// A known source failed; it stays scheduled and is retried on the next call
    #[error("fetching from {site} failed (attempt {attempt}, retry after {retry_after:?}): {reason}")]
    FetchFailed {
        site: SourceUrl,
        attempt: u32,
        retry_after: Duration,
        reason: String,
    },

    /// A source hit the configured attempt cap and was removed from the roster
    #[error("abandoned {site} after {attempts} failed attempts")]
    SourceAbandoned { site: SourceUrl, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Pull-based provider of repository records
pub struct Provider<F: ScraperFactory, S: Searcher> {
    factory: F,
    searcher: S,
    query: String,
    known_sources: Arc<dyn KnownSourceRegistry>,
    delivered: Arc<dyn DeliveredRepositorySet>,
    state: Mutex<ProviderState<F::Scraper>>,
}

impl<F: ScraperFactory, S: Searcher> Provider<F, S> {
    /// Creates a provider with default backoff and an empty query
    pub fn new(
        factory: F,
        searcher: S,
        known_sources: Arc<dyn KnownSourceRegistry>,
        delivered: Arc<dyn DeliveredRepositorySet>,
    ) -> Self {
        Self {
            factory,
            searcher,
            query: String::new(),
            known_sources,
            delivered,
            state: Mutex::new(ProviderState::new(Backoff::default())),
        }
    }

    /// Sets the query handed to the searcher
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_backoff(mut self, config: BackoffConfig) -> Self {
        self.state = Mutex::new(ProviderState::new(Backoff::new(config)));
        self
    }

    /// Returns the next repository to process
    ///
    /// While an item is pending (delivered but not acknowledged) or was
    /// negatively acknowledged, that same item is returned again.
    ///
    /// # Errors
    ///
    /// * [`ProviderError::Eof`] - every source is exhausted and discovery found none
    /// * [`ProviderError::FetchFailed`] - the current source failed; wait `retry_after`
    /// * [`ProviderError::SourceAbandoned`] - the current source hit the attempt cap
    /// * [`ProviderError::Storage`] - a registry could not be read or written
    pub async fn next(&self) -> Result<RawRepository, ProviderError> {
        let mut state = self.state.lock().await;

        if let Some(item) = state.slot.take_for_delivery() {
            tracing::debug!(url = %item.url, "Redelivering unacknowledged repository");
            return Ok(item);
        }

        if state.roster.is_empty() {
            self.discover(&mut state).await?;
        }

        loop {
            if state.roster.is_empty() {
                state.current = 0;
                return Err(ProviderError::Eof);
            }
            if state.current >= state.roster.len() {
                state.current = 0;
            }

            let index = state.current;
            let pulled = state.roster[index].next().await;
            match pulled {
                Ok(item) => {
                    state.backoff.reset();
                    state.current = (index + 1) % state.roster.len();
                    state.slot = Slot::Pending(item.clone());
                    tracing::debug!(url = %item.url, source = %item.source, "Delivering repository");
                    return Ok(item);
                }
                Err(ScrapeError::Exhausted) => {
                    let scraper = state.remove(index);
                    tracing::info!(source = %scraper.source(), remaining = state.roster.len(), "Source exhausted");
                }
                Err(ScrapeError::Invalid { url, reason }) => {
                    let scraper = state.remove(index);
                    tracing::warn!(source = %scraper.source(), url = %url, reason = %reason, "Dropping source that stopped looking like an index");
                }
                Err(ScrapeError::FetchFailed { url, reason }) => {
                    let retry_after = state.backoff.next_delay();
                    let attempt = state.backoff.attempt();
                    let site = state.roster[index].source().clone();

                    if state.backoff.is_exhausted() {
                        state.remove(index);
                        state.backoff.reset();
                        tracing::error!(source = %site, attempts = attempt, url = %url, reason = %reason, "Abandoning source; its remaining repositories are lost for this cycle");
                        return Err(ProviderError::SourceAbandoned {
                            site,
                            attempts: attempt,
                        });
                    }

                    tracing::warn!(
                        source = %site,
                        attempt,
                        delay_ms = retry_after.as_millis() as u64,
                        url = %url,
                        reason = %reason,
                        "Fetch failed, source kept for retry"
                    );
                    return Err(ProviderError::FetchFailed {
                        site,
                        attempt,
                        retry_after,
                        reason,
                    });
                }
                Err(ScrapeError::Storage(e)) => return Err(e.into()),
            }
        }
    }

    /// Acknowledges the item last returned by [`next`](Self::next)
    ///
    /// [`Ack::Success`] records it as delivered; [`Ack::Failure`] makes the
    /// next call return it again. Without a pending item this is a no-op.
    pub async fn ack(&self, outcome: Ack) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;

        let item = match std::mem::take(&mut state.slot) {
            Slot::Pending(item) => item,
            other => {
                state.slot = other;
                tracing::trace!("Ack without pending item ignored");
                return Ok(());
            }
        };

        match outcome {
            Ack::Success => {
                if let Err(e) = self.delivered.add_repository(&item) {
                    // Keep the item pending so the ack can be retried
                    state.slot = Slot::Pending(item);
                    return Err(e.into());
                }
                tracing::debug!(url = %item.url, "Repository acknowledged");
            }
            Ack::Failure => {
                tracing::debug!(url = %item.url, "Repository rejected, will be redelivered");
                state.slot = Slot::Replay(item);
            }
        }

        Ok(())
    }

    /// Number of scrapers currently scheduled
    pub async fn roster_len(&self) -> usize {
        self.state.lock().await.roster.len()
    }

    /// Round-robin position of the next pull
    pub async fn current_index(&self) -> usize {
        self.state.lock().await.current
    }

    /// Consecutive failures charged since the last successful delivery
    pub async fn backoff_attempt(&self) -> u32 {
        self.state.lock().await.backoff.attempt()
    }

    /// Sources currently scheduled, in roster order
    pub async fn scheduled_sources(&self) -> Vec<SourceUrl> {
        self.state
            .lock()
            .await
            .roster
            .iter()
            .map(|scraper| scraper.source().clone())
            .collect()
    }

    /// Builds a fresh roster from search results and the known-source registry
    async fn discover(&self, state: &mut ProviderState<F::Scraper>) -> Result<(), ProviderError> {
        let found = match self.searcher.search(&self.query).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(query = %self.query, error = %e, "Search failed, continuing with known sources");
                Vec::new()
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<SourceUrl> = Vec::new();

        for raw in &found {
            match SourceUrl::parse(raw) {
                Ok(candidate) => {
                    if seen.insert(candidate.key().to_string()) {
                        candidates.push(candidate);
                    }
                }
                Err(e) => tracing::debug!(candidate = %raw, error = %e, "Ignoring unparsable candidate"),
            }
        }
        for known in self.known_sources.all_known_sources()? {
            if seen.insert(known.key().to_string()) {
                candidates.push(known);
            }
        }

        // Built aside so a storage error leaves the roster empty and the
        // next call rediscovers every candidate
        let mut roster = Vec::with_capacity(candidates.len());
        let mut validated = 0usize;
        for candidate in candidates {
            let mut scraper = self.factory.create(&candidate);

            if self.known_sources.contains_source(&candidate)? {
                roster.push(scraper);
                continue;
            }

            match scraper.validate_first_fetch().await {
                Ok(()) => {
                    self.known_sources.add_source(&candidate)?;
                    validated += 1;
                    tracing::info!(source = %candidate, "Registered new source");
                    roster.push(scraper);
                }
                Err(ScrapeError::Storage(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(source = %candidate, error = %e, "Discarding invalid candidate");
                }
            }
        }

        state.roster = roster;
        state.current = 0;
        tracing::info!(
            searched = found.len(),
            validated,
            scheduled = state.roster.len(),
            "Discovery finished"
        );
        Ok(())
    }
}
