//! Scraper for cgit index sites

use crate::robots::{fetch_robots, ParsedRobots};
use crate::scraping::{
    fetch_html, parse_cgit_index, ListedRepository, Page, PageSource, PagedScraper, RawRepository,
    ScrapeError, ScraperFactory,
};
use crate::storage::DeliveredRepositorySet;
use crate::url::SourceUrl;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Scraper enumerating one cgit installation
pub type CgitScraper = PagedScraper<CgitPages>;

/// Per-source politeness settings
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Minimum time between two page fetches of the same source
    pub min_page_interval: Duration,
    /// Whether robots.txt is consulted before the first fetch
    pub respect_robots: bool,
    /// Product token matched against robots.txt user-agent groups
    pub robots_agent: String,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            min_page_interval: Duration::from_millis(1000),
            respect_robots: true,
            robots_agent: "CgitRover".to_string(),
        }
    }
}

/// Page source for a cgit index
pub struct CgitPages {
    client: Client,
    source: SourceUrl,
    settings: ScraperSettings,
    robots: Option<ParsedRobots>,
    last_fetch: Option<Instant>,
}

impl CgitPages {
    pub fn new(client: Client, source: SourceUrl, settings: ScraperSettings) -> Self {
        Self {
            client,
            source,
            settings,
            robots: None,
            last_fetch: None,
        }
    }

    /// Effective delay between fetches: the configured minimum or the site's Crawl-delay
    pub fn page_interval(&self) -> Duration {
        let crawl_delay = self
            .robots
            .as_ref()
            .and_then(|robots| robots.crawl_delay(&self.settings.robots_agent))
            .unwrap_or_default();

        self.settings.min_page_interval.max(crawl_delay)
    }

    async fn wait_for_turn(&self) {
        let Some(last_fetch) = self.last_fetch else {
            return;
        };

        let wait = self.page_interval().saturating_sub(last_fetch.elapsed());
        if !wait.is_zero() {
            tracing::trace!(source = %self.source, wait_ms = wait.as_millis() as u64, "Waiting between pages");
            tokio::time::sleep(wait).await;
        }
    }

    fn to_repository(&self, listed: ListedRepository) -> RawRepository {
        let mut repository = RawRepository::new(listed.url, self.source.clone());
        if !listed.name.is_empty() {
            repository = repository.with_name(listed.name);
        }
        if let Some(description) = listed.description {
            repository = repository.with_description(description);
        }
        repository
    }
}

impl PageSource for CgitPages {
    async fn fetch_page(&mut self, page: &Url) -> Result<Page, ScrapeError> {
        if self.settings.respect_robots {
            if self.robots.is_none() {
                self.robots = Some(fetch_robots(&self.client, self.source.url()).await);
            }
            let allowed = self
                .robots
                .as_ref()
                .map_or(true, |robots| robots.is_allowed(page.as_str(), &self.settings.robots_agent));
            if !allowed {
                return Err(ScrapeError::Invalid {
                    url: page.to_string(),
                    reason: "disallowed by robots.txt".to_string(),
                });
            }
        }

        self.wait_for_turn().await;
        let fetched = fetch_html(&self.client, page.as_str()).await;
        self.last_fetch = Some(Instant::now());

        let body = fetched.map_err(|failure| ScrapeError::FetchFailed {
            url: page.to_string(),
            reason: failure.to_string(),
        })?;

        let index = parse_cgit_index(&body, page);
        if !index.is_cgit() {
            return Err(ScrapeError::Invalid {
                url: page.to_string(),
                reason: "not a cgit repository index".to_string(),
            });
        }

        Ok(Page {
            next: index.next_page,
            repositories: index
                .repositories
                .into_iter()
                .map(|listed| self.to_repository(listed))
                .collect(),
        })
    }
}

/// Creates a [`CgitScraper`] per source, sharing one HTTP client
#[derive(Clone)]
pub struct CgitScraperFactory {
    client: Client,
    delivered: Arc<dyn DeliveredRepositorySet>,
    settings: ScraperSettings,
}

impl CgitScraperFactory {
    pub fn new(
        client: Client,
        delivered: Arc<dyn DeliveredRepositorySet>,
        settings: ScraperSettings,
    ) -> Self {
        Self {
            client,
            delivered,
            settings,
        }
    }
}

impl ScraperFactory for CgitScraperFactory {
    type Scraper = CgitScraper;

    fn create(&self, source: &SourceUrl) -> CgitScraper {
        let pages = CgitPages::new(self.client.clone(), source.clone(), self.settings.clone());
        PagedScraper::new(source.clone(), pages, self.delivered.clone())
    }
}
