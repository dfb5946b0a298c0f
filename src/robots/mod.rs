//! robots.txt handling
//!
//! Index sites are checked once, when their scraper fetches its first page.

mod parser;

pub use parser::ParsedRobots;

use reqwest::{Client, StatusCode};
use url::Url;

/// Location of the robots.txt file governing `site`
pub fn robots_url(site: &Url) -> Option<Url> {
    let mut url = site.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.join("/robots.txt").ok()
}

/// Fetches robots.txt for a site
///
/// A missing file (4xx) or an unreachable one both yield
/// [`ParsedRobots::allow_all`]; the index fetch itself reports reachability.
pub async fn fetch_robots(client: &Client, site: &Url) -> ParsedRobots {
    let Some(url) = robots_url(site) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "robots.txt unreachable");
            return ParsedRobots::allow_all();
        }
    };

    if response.status() != StatusCode::OK {
        tracing::debug!(url = %url, status = response.status().as_u16(), "No robots.txt");
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(content) => ParsedRobots::from_content(&content),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Failed to read robots.txt");
            ParsedRobots::allow_all()
        }
    }
}
