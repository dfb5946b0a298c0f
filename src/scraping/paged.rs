//! Generic paginated scraper
//!
//! [`PagedScraper`] turns a [`PageSource`] (something that can fetch one page
//! and point at the next) into a [`Scraper`]. It owns the cursor, buffers the
//! repositories of the current page and drops the ones already delivered.

use crate::scraping::{RawRepository, ScrapeError, Scraper};
use crate::storage::DeliveredRepositorySet;
use crate::url::SourceUrl;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// One fetched and parsed page
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub repositories: Vec<RawRepository>,
    pub next: Option<Url>,
}

/// Fetches single pages of one source
///
/// Implementations apply their own inter-request delay, authentication and
/// access policy.
pub trait PageSource: Send {
    fn fetch_page(&mut self, page: &Url) -> impl Future<Output = Result<Page, ScrapeError>> + Send;
}

/// Scraper over any [`PageSource`]
pub struct PagedScraper<P> {
    source: SourceUrl,
    pages: P,
    delivered: Arc<dyn DeliveredRepositorySet>,
    /// Next page to fetch; `None` once the last page has been fetched
    cursor: Option<Url>,
    visited: HashSet<String>,
    buffer: VecDeque<RawRepository>,
    pages_fetched: u32,
}

impl<P: PageSource> PagedScraper<P> {
    pub fn new(source: SourceUrl, pages: P, delivered: Arc<dyn DeliveredRepositorySet>) -> Self {
        let cursor = Some(source.url().clone());
        Self {
            source,
            pages,
            delivered,
            cursor,
            visited: HashSet::new(),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Number of pages fetched successfully so far
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// True once every page was fetched and every buffered candidate consumed
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none() && self.buffer.is_empty()
    }

    /// Fetches the page under the cursor; returns `false` if there is none
    async fn fetch_next_page(&mut self) -> Result<bool, ScrapeError> {
        let Some(page_url) = self.cursor.clone() else {
            return Ok(false);
        };

        let page = self.pages.fetch_page(&page_url).await?;

        self.visited.insert(page_url.to_string());
        self.pages_fetched += 1;

        // A pager pointing back at an already fetched page ends the listing
        self.cursor = page
            .next
            .filter(|next| !self.visited.contains(next.as_str()));

        tracing::debug!(
            source = %self.source,
            page = %page_url,
            repositories = page.repositories.len(),
            has_next = self.cursor.is_some(),
            "Fetched index page"
        );

        self.buffer.extend(page.repositories);
        Ok(true)
    }
}

impl<P: PageSource> Scraper for PagedScraper<P> {
    fn source(&self) -> &SourceUrl {
        &self.source
    }

    async fn validate_first_fetch(&mut self) -> Result<(), ScrapeError> {
        if self.pages_fetched > 0 {
            return Ok(());
        }

        match self.fetch_next_page().await {
            Ok(_) => Ok(()),
            Err(ScrapeError::FetchFailed { url, reason }) => {
                Err(ScrapeError::Invalid { url, reason })
            }
            Err(e) => Err(e),
        }
    }

    async fn next(&mut self) -> Result<RawRepository, ScrapeError> {
        loop {
            while let Some(candidate) = self.buffer.front() {
                if self.delivered.contains_repository(&candidate.url)? {
                    tracing::trace!(url = %candidate.url, "Skipping delivered repository");
                    self.buffer.pop_front();
                    continue;
                }
                if let Some(repository) = self.buffer.pop_front() {
                    return Ok(repository);
                }
            }

            if !self.fetch_next_page().await? {
                return Err(ScrapeError::Exhausted);
            }
        }
    }
}
