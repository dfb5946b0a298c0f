//! URL handling module for cgit-rover
//!
//! This module provides URL normalization and the [`SourceUrl`] identity type
//! used to deduplicate candidate index sites.

mod normalize;

pub use normalize::{normalize_repository_url, normalize_source_url};

use crate::UrlResult;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// Normalized base URL of one index site
///
/// Two source URLs are equal when their hosts, ports and normalized paths
/// match. The scheme is not part of the identity: `http://host/git` and
/// `https://host/git/` name the same site. The scheme of the first form seen
/// is kept for fetching.
#[derive(Debug, Clone)]
pub struct SourceUrl {
    url: Url,
    key: String,
}

impl SourceUrl {
    /// Parses and normalizes a candidate source URL
    ///
    /// # Examples
    ///
    /// ```
    /// use cgit_rover::url::SourceUrl;
    ///
    /// let a = SourceUrl::parse("https://a3nm.net/git").unwrap();
    /// let b = SourceUrl::parse("http://A3NM.net/git/").unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.key(), "a3nm.net/git");
    /// ```
    pub fn parse(url_str: &str) -> UrlResult<Self> {
        let url = normalize_source_url(url_str)?;
        let key = identity_key(&url);
        Ok(Self { url, key })
    }

    /// The URL to fetch, always ending in `/`
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The parsed URL to fetch
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Scheme-less identity used for deduplication and storage
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Builds the identity key: host, explicit port, and the path without its trailing slash
fn identity_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let path = url.path().trim_end_matches('/');

    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, path),
        None => format!("{}{}", host, path),
    }
}

impl PartialEq for SourceUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SourceUrl {}

impl Hash for SourceUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
