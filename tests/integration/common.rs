//! Mock cgit sites and provider wiring shared by the integration tests

use cgit_rover::backoff::BackoffConfig;
use cgit_rover::config::UserAgentConfig;
use cgit_rover::provider::{Ack, Provider, ProviderError};
use cgit_rover::scraping::{build_http_client, CgitScraperFactory, ScraperSettings};
use cgit_rover::search::Searcher;
use cgit_rover::storage::SqliteStorage;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AGENT: &str = "TestRover";

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: AGENT.to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

pub fn client() -> reqwest::Client {
    build_http_client(&user_agent(), Duration::from_secs(5)).unwrap()
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

/// Renders a cgit index page listing `repos` under `prefix`
///
/// `page` is the zero-based page number out of `total` pages.
pub fn cgit_page(prefix: &str, repos: &[&str], page: usize, total: usize) -> String {
    let rows: String = repos
        .iter()
        .map(|name| {
            format!(
                "<tr><td class='toplevel-repo'><a title='{name}' href='{prefix}{name}/'>{name}</a></td>\
                 <td><a href='{prefix}{name}/'>{name} description</a></td><td></td><td></td></tr>\n"
            )
        })
        .collect();

    let pager: String = if total > 1 {
        let items: String = (0..total)
            .map(|i| {
                let href = if i == 0 {
                    prefix.to_string()
                } else {
                    format!("{}?ofs={}", prefix, i)
                };
                let class = if i == page { " class='current'" } else { "" };
                format!("<li><a{} href='{}'>[{}]</a></li>", class, href, i + 1)
            })
            .collect();
        format!("<ul class='pager'>{}</ul>", items)
    } else {
        String::new()
    };

    format!(
        "<!DOCTYPE html><html><head><title>git</title>\
         <meta name='generator' content='cgit v1.2.3'/></head><body><div id='cgit'>\
         <table summary='repository list' class='list nowrap'>\
         <tr class='nohover'><th class='left'><a href='{prefix}?s=name'>Name</a></th></tr>\n\
         {rows}</table>{pager}</div></body></html>"
    )
}

/// Mounts a paginated cgit index at `prefix` plus a permissive robots.txt
pub async fn mount_cgit_site(server: &MockServer, prefix: &str, pages: &[&[&str]]) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(server)
        .await;

    for (i, repos) in pages.iter().enumerate() {
        let body = cgit_page(prefix, repos, i, pages.len());
        if i == 0 {
            Mock::given(method("GET"))
                .and(path(prefix))
                .respond_with(html(body))
                .mount(server)
                .await;
        } else {
            Mock::given(method("GET"))
                .and(path(prefix))
                .and(query_param("ofs", i.to_string()))
                .respond_with(html(body))
                .with_priority(1)
                .mount(server)
                .await;
        }
    }
}

pub fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        min_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        factor: 2.0,
        jitter: false,
        max_attempts: None,
    }
}

pub fn settings() -> ScraperSettings {
    ScraperSettings {
        min_page_interval: Duration::ZERO,
        respect_robots: true,
        robots_agent: AGENT.to_string(),
    }
}

pub fn provider<S: Searcher>(
    storage: &Arc<SqliteStorage>,
    searcher: S,
) -> Provider<CgitScraperFactory, S> {
    let factory = CgitScraperFactory::new(client(), storage.clone(), settings());
    Provider::new(factory, searcher, storage.clone(), storage.clone())
        .with_query("cgit")
        .with_backoff(fast_backoff())
}

/// Pulls and acknowledges until `Eof`
pub async fn drain<S: Searcher>(provider: &Provider<CgitScraperFactory, S>) -> Vec<String> {
    let mut urls = Vec::new();
    loop {
        match provider.next().await {
            Ok(repository) => {
                urls.push(repository.url);
                provider.ack(Ack::Success).await.unwrap();
            }
            Err(ProviderError::Eof) => return urls,
            Err(e) => panic!("unexpected provider error: {}", e),
        }
    }
}
