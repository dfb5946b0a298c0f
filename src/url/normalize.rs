use crate::UrlError;
use url::Url;

/// Normalizes a candidate source URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http:// and https:// (the scheme itself is kept for fetching)
/// 3. Lowercase the host (done by the parser for http(s))
/// 4. Drop credentials, query string and fragment
/// 5. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Always end with exactly one trailing slash
///
/// The `www.` prefix is kept: a bare domain and its `www` host are
/// different sites as far as cgit installations go.
///
/// # Examples
///
/// ```
/// use cgit_rover::url::normalize_source_url;
///
/// let url = normalize_source_url("https://Git.Example.COM//git/./").unwrap();
/// assert_eq!(url.as_str(), "https://git.example.com/git/");
/// ```
pub fn normalize_source_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = parse_http_url(url_str)?;

    // Credentials never identify a site
    let _ = url.set_username("");
    let _ = url.set_password(None);

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Normalizes a repository URL scraped from an index page
///
/// Repository URLs are compared verbatim once normalized, so only the
/// parts that never change what is served are touched: the fragment is
/// dropped and the host lowercased.
///
/// # Examples
///
/// ```
/// use cgit_rover::url::normalize_repository_url;
///
/// let url = normalize_repository_url("https://EXAMPLE.com/git/repo.git/#about").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/git/repo.git/");
/// ```
pub fn normalize_repository_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = parse_http_url(url_str)?;
    url.set_fragment(None);
    Ok(url)
}

/// Parses a URL and checks it is an http(s) URL with a host
fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and empty segments,
/// and terminating it with a single slash
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            // Parent directory - pop the last segment if possible
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}/", normalized_segments.join("/"))
}
