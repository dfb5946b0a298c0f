//! Searcher tests against a mock search endpoint

use crate::common::{client, drain, html, mount_cgit_site, provider};
use cgit_rover::search::{CompositeSearcher, SeedSearcher, Searcher, WebSearcher};
use cgit_rover::storage::{KnownSourceRegistry, SqliteStorage};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_results(search: &MockServer, links: &[String]) {
    let body: String = links
        .iter()
        .map(|link| format!("<div class='result'><a href='{}'>result</a></div>", link))
        .collect();
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "powered by cgit"))
        .respond_with(html(format!("<html><body>{}</body></html>", body)))
        .mount(search)
        .await;
}

fn endpoint(search: &MockServer) -> Url {
    Url::parse(&format!("{}/html/", search.uri())).unwrap()
}

#[tokio::test]
async fn test_web_search_reduces_results_to_sites() {
    let search = MockServer::start().await;
    mount_results(
        &search,
        &[
            "https://git.zx2c4.com/cgit/tree/README".to_string(),
            "https://a3nm.net/git/mybin/log/".to_string(),
            "https://a3nm.net/git/plint/".to_string(),
            format!("{}/html/?q=page2", search.uri()),
        ],
    )
    .await;

    let searcher = WebSearcher::new(client(), endpoint(&search), 10);
    let found = searcher.search("powered by cgit").await.unwrap();

    assert_eq!(
        found,
        vec![
            "https://git.zx2c4.com/",
            "https://a3nm.net/git/",
            "https://a3nm.net/git/plint/",
        ]
    );
}

#[tokio::test]
async fn test_web_search_error_status() {
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&search)
        .await;

    let searcher = WebSearcher::new(client(), endpoint(&search), 10);
    assert!(searcher.search("powered by cgit").await.is_err());
}

#[tokio::test]
async fn test_search_feeds_discovery() {
    let site = MockServer::start().await;
    mount_cgit_site(&site, "/git/", &[&["alpha"]]).await;

    let search = MockServer::start().await;
    mount_results(&search, &[format!("{}/git/alpha/tree/", site.uri())]).await;

    let dir = TempDir::new().unwrap();
    let storage = Arc::new(SqliteStorage::new(&dir.path().join("rover.db")).unwrap());
    let searcher = CompositeSearcher::new(
        SeedSearcher::new(Vec::new()),
        WebSearcher::new(client(), endpoint(&search), 10),
    );
    let provider = provider(&storage, searcher).with_query("powered by cgit");

    let delivered = drain(&provider).await;

    assert_eq!(delivered, vec![format!("{}/git/alpha/", site.uri())]);
    let known = storage.all_known_sources().unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].as_str(), format!("{}/git/", site.uri()));
}
