//! HTTP fetching for index pages
//!
//! This module handles the HTTP side of scraping:
//! - Building the shared client with the crawler's user agent string
//! - GET requests for index pages
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("not an HTML page (Content-Type: {0})")]
    ContentMismatch(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds the HTTP client shared by every scraper and searcher
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Example
///
/// ```no_run
/// use cgit_rover::config::UserAgentConfig;
/// use cgit_rover::scraping::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CgitRover".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format_user_agent(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches an HTML page and returns its body
///
/// A missing Content-Type header is accepted; cgit behind some proxies omits it.
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, FetchFailure> {
    let response = client.get(url).send().await.map_err(classify)?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchFailure::RateLimited);
    }
    if !status.is_success() {
        return Err(FetchFailure::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.contains("html") {
        return Err(FetchFailure::ContentMismatch(content_type));
    }

    response.text().await.map_err(classify)
}

fn classify(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout
    } else if error.is_connect() {
        FetchFailure::Connect(error.to_string())
    } else {
        FetchFailure::Network(error.to_string())
    }
}
