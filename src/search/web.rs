//! Search through an HTML search-engine endpoint

use crate::scraping::fetch_html;
use crate::search::{SearchError, Searcher};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Path segments cgit uses for per-repository pages
const CGIT_ACTIONS: &[&str] = &[
    "about", "blame", "blob", "commit", "diff", "log", "patch", "plain", "refs", "snapshot",
    "stats", "summary", "tag", "tree",
];

/// Queries `<endpoint>?q=<query>` and collects result links
///
/// Every result is reduced to the index site it most likely belongs to (see
/// [`site_base`]). Links back to the search engine itself are dropped.
#[derive(Debug, Clone)]
pub struct WebSearcher {
    client: Client,
    endpoint: Url,
    max_results: usize,
}

impl WebSearcher {
    pub fn new(client: Client, endpoint: Url, max_results: usize) -> Self {
        Self {
            client,
            endpoint,
            max_results,
        }
    }

    fn query_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", query);
        url
    }

    fn extract_candidates(&self, html: &str, page_url: &Url) -> Vec<String> {
        let Ok(links) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let mut candidates: Vec<String> = Vec::new();
        for href in document
            .select(&links)
            .filter_map(|element| element.value().attr("href"))
        {
            let Ok(url) = page_url.join(href.trim()) else {
                continue;
            };
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }
            if url.host_str() == self.endpoint.host_str()
                && url.port_or_known_default() == self.endpoint.port_or_known_default()
            {
                continue;
            }

            let base = site_base(&url);
            if !candidates.contains(&base) {
                candidates.push(base);
            }
            if candidates.len() >= self.max_results {
                break;
            }
        }

        candidates
    }
}

impl Searcher for WebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let url = self.query_url(query);

        let body = fetch_html(&self.client, url.as_str())
            .await
            .map_err(|failure| SearchError::Request(failure.to_string()))?;

        let candidates = self.extract_candidates(&body, &url);
        tracing::info!(query = %query, candidates = candidates.len(), "Search finished");
        Ok(candidates)
    }
}

/// Reduces a link to the base URL of the cgit index it points into
///
/// `https://host/cgit/repo.git/tree/src` becomes `https://host/cgit/`: the
/// segment before the first cgit action names the repository, the index sits
/// above it. Links without an action keep their path.
pub fn site_base(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let keep = match segments.iter().position(|s| CGIT_ACTIONS.contains(s)) {
        Some(action) => action.saturating_sub(1),
        None => segments.len(),
    };

    let mut base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    base.push('/');
    for segment in &segments[..keep] {
        base.push_str(segment);
        base.push('/');
    }
    base
}
