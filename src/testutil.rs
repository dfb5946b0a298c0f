//! Shared fakes for unit tests

use crate::scraping::{Page, PageSource, PagedScraper, RawRepository, ScrapeError, ScraperFactory};
use crate::search::{SearchError, Searcher};
use crate::storage::{
    DeliveredRepositorySet, KnownSourceRegistry, MemoryStorage, StorageError, StorageResult,
};
use crate::url::SourceUrl;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub fn source(url: &str) -> SourceUrl {
    SourceUrl::parse(url).unwrap()
}

/// Repository `<site>/<name>/`
pub fn repo(site: &SourceUrl, name: &str) -> RawRepository {
    RawRepository::new(format!("{}{}/", site.as_str(), name), site.clone()).with_name(name)
}

#[derive(Debug, Clone)]
enum Step {
    Page(Vec<String>),
    Failure,
    FailForever,
}

/// Page source replaying a script of pages and failures
#[derive(Debug, Clone)]
pub struct ScriptedPages {
    source: SourceUrl,
    script: VecDeque<Step>,
    fetched: usize,
    loop_back: Option<Url>,
}

impl ScriptedPages {
    pub fn new(source: SourceUrl) -> Self {
        Self {
            source,
            script: VecDeque::new(),
            fetched: 0,
            loop_back: None,
        }
    }

    pub fn source(&self) -> &SourceUrl {
        &self.source
    }

    /// Appends a page listing `<site>/<name>/` for each name
    pub fn page(mut self, names: &[&str]) -> Self {
        self.script
            .push_back(Step::Page(names.iter().map(|n| n.to_string()).collect()));
        self
    }

    /// Appends one failing fetch
    pub fn failure(mut self) -> Self {
        self.script.push_back(Step::Failure);
        self
    }

    /// Every fetch from here on fails
    pub fn failing_forever(mut self) -> Self {
        self.script.push_back(Step::FailForever);
        self
    }

    /// The last page's pager points at `url`
    pub fn linking_back_to(mut self, url: Url) -> Self {
        self.loop_back = Some(url);
        self
    }
}

impl PageSource for ScriptedPages {
    async fn fetch_page(&mut self, page: &Url) -> Result<Page, ScrapeError> {
        let failed = || ScrapeError::FetchFailed {
            url: page.to_string(),
            reason: "scripted failure".to_string(),
        };

        match self.script.front() {
            Some(Step::FailForever) => return Err(failed()),
            Some(Step::Failure) => {
                self.script.pop_front();
                return Err(failed());
            }
            _ => {}
        }

        let names = match self.script.pop_front() {
            Some(Step::Page(names)) => names,
            _ => Vec::new(),
        };
        self.fetched += 1;

        let next = if self.script.is_empty() {
            self.loop_back.clone()
        } else {
            self.source
                .url()
                .join(&format!("?ofs={}", self.fetched))
                .ok()
        };

        Ok(Page {
            repositories: names.iter().map(|name| repo(&self.source, name)).collect(),
            next,
        })
    }
}

/// Factory handing out [`ScriptedPages`] scrapers by source
///
/// Sources without a script fail their first fetch.
pub struct ScriptedFactory {
    scripts: HashMap<String, ScriptedPages>,
    delivered: Arc<dyn DeliveredRepositorySet>,
}

impl ScriptedFactory {
    pub fn new(delivered: Arc<dyn DeliveredRepositorySet>) -> Self {
        Self {
            scripts: HashMap::new(),
            delivered,
        }
    }

    pub fn with(mut self, pages: ScriptedPages) -> Self {
        self.scripts.insert(pages.source().key().to_string(), pages);
        self
    }
}

impl ScraperFactory for ScriptedFactory {
    type Scraper = PagedScraper<ScriptedPages>;

    fn create(&self, source: &SourceUrl) -> Self::Scraper {
        let pages = self
            .scripts
            .get(source.key())
            .cloned()
            .unwrap_or_else(|| ScriptedPages::new(source.clone()).failure());
        PagedScraper::new(source.clone(), pages, self.delivered.clone())
    }
}

/// Searcher that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSearcher;

impl Searcher for FailingSearcher {
    async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
        Err(SearchError::Status(503))
    }
}

/// In-memory registries with switchable storage failures
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing_sources: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    fail_lookups: AtomicBool,
    failing_adds: AtomicUsize,
}

fn disk_full() -> StorageError {
    StorageError::Corrupt("disk full".to_string())
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `add_source` for this source fails
    pub fn fail_add_source_once(&self, source: &SourceUrl) {
        self.failing_sources
            .lock()
            .unwrap()
            .insert(source.key().to_string());
    }

    pub fn fail_listing_sources(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delivered_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// The next `count` calls to `add_repository` fail
    pub fn fail_next_adds(&self, count: usize) {
        self.failing_adds.store(count, Ordering::SeqCst);
    }
}

impl KnownSourceRegistry for FlakyStorage {
    fn contains_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        self.inner.contains_source(source)
    }

    fn add_source(&self, source: &SourceUrl) -> StorageResult<bool> {
        if self.failing_sources.lock().unwrap().remove(source.key()) {
            return Err(disk_full());
        }
        self.inner.add_source(source)
    }

    fn all_known_sources(&self) -> StorageResult<Vec<SourceUrl>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(disk_full());
        }
        self.inner.all_known_sources()
    }
}

impl DeliveredRepositorySet for FlakyStorage {
    fn contains_repository(&self, url: &str) -> StorageResult<bool> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(disk_full());
        }
        self.inner.contains_repository(url)
    }

    fn add_repository(&self, repository: &RawRepository) -> StorageResult<bool> {
        let failing = self
            .failing_adds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(disk_full());
        }
        self.inner.add_repository(repository)
    }
}
