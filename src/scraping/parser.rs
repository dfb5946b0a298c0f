//! HTML parser for cgit repository index pages
//!
//! This module extracts from a cgit index page:
//! - The repository rows of `table.list` (link, name, description)
//! - The pager link to the following page
//! - The generator tag used to recognise cgit at all

use crate::url::normalize_repository_url;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One row of the repository list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRepository {
    /// Absolute repository URL
    pub url: String,
    pub name: String,
    pub description: Option<String>,
}

/// Extracted contents of one index page
#[derive(Debug, Clone, Default)]
pub struct CgitIndex {
    /// Content of `<meta name="generator">`, e.g. `cgit v1.2.3`
    pub generator: Option<String>,
    /// Whether the page carries a `table.list` repository table
    pub has_repository_table: bool,
    pub repositories: Vec<ListedRepository>,
    /// Absolute URL of the next pager page
    pub next_page: Option<Url>,
}

impl CgitIndex {
    /// True if the page looks like a cgit repository index
    pub fn is_cgit(&self) -> bool {
        let generated_by_cgit = self
            .generator
            .as_deref()
            .is_some_and(|generator| generator.trim().to_lowercase().starts_with("cgit"));

        generated_by_cgit || self.has_repository_table
    }
}

/// Parses a cgit index page
///
/// # Arguments
///
/// * `html` - The page content
/// * `page_url` - URL the page was fetched from, used to resolve relative links
///
/// # Example
///
/// ```
/// use cgit_rover::scraping::parse_cgit_index;
/// use url::Url;
///
/// let html = r#"<table class="list"><tr>
///     <td class="toplevel-repo"><a href="/git/mybin/">mybin</a></td>
///     <td><a href="/git/mybin/">my scripts</a></td>
/// </tr></table>"#;
/// let page = Url::parse("https://a3nm.net/git/").unwrap();
/// let index = parse_cgit_index(html, &page);
/// assert!(index.is_cgit());
/// assert_eq!(index.repositories[0].url, "https://a3nm.net/git/mybin/");
/// ```
pub fn parse_cgit_index(html: &str, page_url: &Url) -> CgitIndex {
    let document = Html::parse_document(html);

    CgitIndex {
        generator: extract_generator(&document),
        has_repository_table: selector("table.list")
            .is_some_and(|table| document.select(&table).next().is_some()),
        repositories: extract_repositories(&document, page_url),
        next_page: extract_next_page(&document, page_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_generator(document: &Html) -> Option<String> {
    let meta = selector("meta[name='generator']")?;

    document
        .select(&meta)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

fn extract_repositories(document: &Html, page_url: &Url) -> Vec<ListedRepository> {
    let (Some(rows), Some(repo_link), Some(cells), Some(link)) = (
        selector("table.list tr"),
        selector("td.toplevel-repo a[href], td.sublevel-repo a[href]"),
        selector("td"),
        selector("a"),
    ) else {
        return Vec::new();
    };

    let mut repositories: Vec<ListedRepository> = Vec::new();

    for row in document.select(&rows) {
        let Some(anchor) = row.select(&repo_link).next() else {
            // Header and section rows
            continue;
        };
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page_url))
        else {
            continue;
        };
        if repositories.iter().any(|existing| existing.url == url) {
            continue;
        }

        let name = match element_text(&anchor) {
            text if !text.is_empty() => text,
            _ => anchor.value().attr("title").unwrap_or_default().to_string(),
        };

        // Long descriptions are truncated in the cell text but kept whole in the title
        let description = row.select(&cells).nth(1).and_then(|cell| {
            let full = cell
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("title"))
                .map(str::to_string);
            full.or_else(|| Some(element_text(&cell)))
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        });

        repositories.push(ListedRepository {
            url,
            name,
            description,
        });
    }

    repositories
}

/// Finds the pager link following the current page
fn extract_next_page(document: &Html, page_url: &Url) -> Option<Url> {
    let pager_links = selector("ul.pager a[href]")?;
    let links: Vec<ElementRef<'_>> = document.select(&pager_links).collect();

    let next = match links
        .iter()
        .position(|a| a.value().classes().any(|class| class == "current"))
    {
        Some(current) => links.get(current + 1),
        None => links.iter().find(|a| {
            let text = element_text(a).to_lowercase();
            text.contains("next") || text.contains('»')
        }),
    }?;

    let href = next.value().attr("href")?;
    page_url.join(href.trim()).ok()
}

/// Resolves a repository href to an absolute URL
///
/// Returns None for non-HTTP(S) links, sort links carrying a query, and
/// fragment-only anchors.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || href.contains('?') {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    normalize_repository_url(absolute_url.as_str())
        .ok()
        .map(String::from)
}
