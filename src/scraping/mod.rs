//! Scraping module: per-source repository enumeration
//!
//! A [`Scraper`] owns the pagination state of exactly one index site. The
//! provider only sees the narrow [`Scraper`] / [`ScraperFactory`] interface;
//! everything below it (HTTP, HTML parsing, rate limiting) is a detail of the
//! concrete source family.
//!
//! - [`PagedScraper`] implements the scraper contract on top of any
//!   [`PageSource`] (buffering, cursor handling, delivered-set filtering)
//! - [`CgitPages`] is the page source for cgit index sites

mod cgit;
mod fetcher;
mod paged;
mod parser;
mod traits;

pub use cgit::{CgitPages, CgitScraper, CgitScraperFactory, ScraperSettings};
pub use fetcher::{build_http_client, fetch_html, format_user_agent, FetchFailure};
pub use paged::{Page, PageSource, PagedScraper};
pub use parser::{parse_cgit_index, CgitIndex, ListedRepository};
pub use traits::{ScrapeError, Scraper, ScraperFactory};

use crate::url::SourceUrl;

/// One repository candidate produced by a scraper
///
/// Immutable value handed to the consumer by [`Provider::next`](crate::Provider::next).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRepository {
    /// Absolute repository URL as listed by the index
    pub url: String,
    /// The index site the repository was found on
    pub source: SourceUrl,
    /// Repository name from the index row, if any
    pub name: Option<String>,
    /// Repository description from the index row, if any
    pub description: Option<String>,
}

impl RawRepository {
    pub fn new(url: String, source: SourceUrl) -> Self {
        Self {
            url,
            source,
            name: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
