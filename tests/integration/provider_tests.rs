//! Provider tests against mock cgit servers

use crate::common::{client, drain, html, mount_cgit_site, provider, settings};
use cgit_rover::provider::{Ack, Provider, ProviderError};
use cgit_rover::scraping::{CgitScraperFactory, ScraperSettings};
use cgit_rover::search::SeedSearcher;
use cgit_rover::storage::{
    DeliveredRepositorySet, KnownSourceRegistry, SqliteStorage, Storage,
};
use cgit_rover::url::SourceUrl;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open(dir: &TempDir) -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::new(&dir.path().join("rover.db")).unwrap())
}

fn seeds(urls: &[String]) -> SeedSearcher {
    SeedSearcher::new(urls.to_vec())
}

#[tokio::test]
async fn test_paginated_site_is_fully_delivered() {
    let server = MockServer::start().await;
    mount_cgit_site(&server, "/git/", &[&["alpha", "beta"], &["gamma"]]).await;
    let site = format!("{}/git/", server.uri());

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    // The same site in three spellings is scraped once
    let provider = provider(
        &storage,
        seeds(&[site.clone(), format!("{}/git", server.uri()), site.clone()]),
    );

    let delivered = drain(&provider).await;

    assert_eq!(
        delivered,
        vec![
            format!("{}/git/alpha/", server.uri()),
            format!("{}/git/beta/", server.uri()),
            format!("{}/git/gamma/", server.uri()),
        ]
    );
    assert_eq!(storage.count_known_sources().unwrap(), 1);
    assert_eq!(storage.count_delivered_repositories().unwrap(), 3);
}

#[tokio::test]
async fn test_delivered_repositories_survive_restart() {
    let server = MockServer::start().await;
    mount_cgit_site(&server, "/git/", &[&["alpha", "beta", "gamma"]]).await;
    let site = format!("{}/git/", server.uri());
    let dir = TempDir::new().unwrap();

    {
        let storage = open(&dir);
        let provider = provider(&storage, seeds(&[site.clone()]));
        let first = provider.next().await.unwrap();
        assert_eq!(first.url, format!("{}/git/alpha/", server.uri()));
        assert_eq!(first.name.as_deref(), Some("alpha"));
        assert_eq!(first.description.as_deref(), Some("alpha description"));
        provider.ack(Ack::Success).await.unwrap();

        // Rejected, so it must come back after the restart
        provider.next().await.unwrap();
        provider.ack(Ack::Failure).await.unwrap();
    }

    // New process: no search results, the site comes from the registry
    let storage = open(&dir);
    let provider = provider(&storage, seeds(&[]));
    let rest = drain(&provider).await;

    assert_eq!(
        rest,
        vec![
            format!("{}/git/beta/", server.uri()),
            format!("{}/git/gamma/", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_two_sites_are_interleaved() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_cgit_site(&first, "/", &[&["a1", "a2"]]).await;
    mount_cgit_site(&second, "/cgit/", &[&["b1"]]).await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let provider = provider(
        &storage,
        seeds(&[format!("{}/", first.uri()), format!("{}/cgit/", second.uri())]),
    );

    let delivered = drain(&provider).await;

    assert_eq!(
        delivered,
        vec![
            format!("{}/a1/", first.uri()),
            format!("{}/cgit/b1/", second.uri()),
            format!("{}/a2/", first.uri()),
        ]
    );
    assert_eq!(provider.roster_len().await, 0);
    assert_eq!(provider.current_index().await, 0);
}

#[tokio::test]
async fn test_non_cgit_candidate_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "<html><head><meta name='generator' content='Gitea'></head><body></body></html>"
                .to_string(),
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let provider = provider(&storage, seeds(&[format!("{}/", server.uri())]));

    assert!(matches!(provider.next().await, Err(ProviderError::Eof)));
    assert_eq!(storage.count_known_sources().unwrap(), 0);
    assert_eq!(provider.backoff_attempt().await, 0);
}

#[tokio::test]
async fn test_unreachable_candidate_is_discarded() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    // Nothing listens on the discard port
    let provider = provider(&storage, seeds(&["http://127.0.0.1:9/git/".to_string()]));

    assert!(matches!(provider.next().await, Err(ProviderError::Eof)));
    assert_eq!(storage.count_known_sources().unwrap(), 0);
    assert_eq!(provider.backoff_attempt().await, 0);
}

#[tokio::test]
async fn test_missing_index_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let provider = provider(&storage, seeds(&[format!("{}/git/", server.uri())]));

    assert!(matches!(provider.next().await, Err(ProviderError::Eof)));
    assert_eq!(storage.count_known_sources().unwrap(), 0);
}

#[tokio::test]
async fn test_robots_disallow_makes_candidate_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_cgit_site(&server, "/git/", &[&["alpha"]]).await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let provider = provider(&storage, seeds(&[format!("{}/git/", server.uri())]));

    assert!(matches!(provider.next().await, Err(ProviderError::Eof)));
    assert_eq!(storage.count_known_sources().unwrap(), 0);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_cgit_site(&server, "/git/", &[&["alpha"]]).await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let factory = CgitScraperFactory::new(
        client(),
        storage.clone(),
        ScraperSettings {
            respect_robots: false,
            ..settings()
        },
    );
    let provider = Provider::new(
        factory,
        seeds(&[format!("{}/git/", server.uri())]),
        storage.clone(),
        storage.clone(),
    );

    assert_eq!(drain(&provider).await.len(), 1);
}

#[tokio::test]
async fn test_failing_known_source_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/git/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_cgit_site(&server, "/git/", &[&["alpha"]]).await;

    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    let site = SourceUrl::parse(&format!("{}/git/", server.uri())).unwrap();
    storage.add_source(&site).unwrap();
    let provider = provider(&storage, seeds(&[]));

    let mut delays = Vec::new();
    for expected in 1..=2 {
        match provider.next().await {
            Err(ProviderError::FetchFailed {
                site: failed,
                attempt,
                retry_after,
                reason,
            }) => {
                assert_eq!(failed, site);
                assert_eq!(attempt, expected);
                assert!(reason.contains("503"));
                delays.push(retry_after);
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert_eq!(provider.roster_len().await, 1);
    }
    assert!(delays[0] < delays[1]);

    let repository = provider.next().await.unwrap();
    assert_eq!(repository.url, format!("{}/git/alpha/", server.uri()));
    assert_eq!(provider.backoff_attempt().await, 0);

    provider.ack(Ack::Success).await.unwrap();
    assert!(storage.contains_repository(&repository.url).unwrap());
}
