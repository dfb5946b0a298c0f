//! Command-line run loop
//!
//! Wires configuration, storage, searchers and the cgit scraper into a
//! [`Provider`] and streams every delivered repository URL to a writer, one
//! per line. A line that was written and flushed counts as processed and is
//! acknowledged; a failed write is negatively acknowledged and ends the run.

use crate::config::Config;
use crate::provider::{Ack, Provider, ProviderError};
use crate::scraping::{build_http_client, CgitScraperFactory, ScraperFactory};
use crate::search::{CompositeSearcher, NullSearcher, Searcher, SeedSearcher, WebSearcher};
use crate::storage::{open_storage, RunStatus, SqliteStorage, Storage};
use crate::{ConfigError, RoverError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Options of one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many deliveries
    pub limit: Option<u64>,
    /// Keep going after `Eof`, rediscovering every `idle_interval`
    pub follow: bool,
    pub idle_interval: Duration,
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub delivered: u64,
    pub fetch_failures: u64,
    pub abandoned_sources: u64,
}

/// Pulls from the provider until it is caught up, the limit is reached or a
/// hard error occurs
pub async fn drive<F, S, W>(
    provider: &Provider<F, S>,
    options: &RunOptions,
    out: &mut W,
) -> Result<RunReport, RoverError>
where
    F: ScraperFactory,
    S: Searcher,
    W: Write,
{
    let mut report = RunReport::default();

    loop {
        if options.limit.is_some_and(|limit| report.delivered >= limit) {
            tracing::info!(delivered = report.delivered, "Delivery limit reached");
            return Ok(report);
        }

        match provider.next().await {
            Ok(repository) => {
                let written = writeln!(out, "{}", repository.url).and_then(|()| out.flush());
                provider.ack(Ack::from(&written)).await?;
                written?;
                report.delivered += 1;
            }
            Err(ProviderError::Eof) if options.follow => {
                tracing::info!(
                    delivered = report.delivered,
                    idle_secs = options.idle_interval.as_secs(),
                    "Caught up, waiting before rediscovery"
                );
                tokio::time::sleep(options.idle_interval).await;
            }
            Err(ProviderError::Eof) => {
                tracing::info!(delivered = report.delivered, "Caught up");
                return Ok(report);
            }
            Err(ProviderError::FetchFailed { retry_after, .. }) => {
                report.fetch_failures += 1;
                tokio::time::sleep(retry_after).await;
            }
            Err(ProviderError::SourceAbandoned { .. }) => {
                report.abandoned_sources += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Runs a complete discovery session against the configured database
///
/// The run is recorded in the `runs` table with its outcome. Ctrl-C ends the
/// run as interrupted; the pending item, if any, stays unacknowledged.
pub async fn run(
    config: &Config,
    config_hash: &str,
    options: &RunOptions,
) -> Result<RunReport, RoverError> {
    let storage = Arc::new(open_storage(Path::new(&config.output.database_path))?);
    let run_id = storage.create_run(config_hash)?;
    let delivered_before = storage.count_delivered_repositories()?;
    tracing::info!(run_id, database = %config.output.database_path, "Run started");

    let client = build_http_client(&config.user_agent, config.scraper.request_timeout())?;
    let factory = CgitScraperFactory::new(
        client.clone(),
        storage.clone(),
        config.scraper.to_settings(&config.user_agent),
    );
    let seeds = SeedSearcher::new(config.search.seeds.clone());

    let outcome = match &config.search.endpoint {
        Some(endpoint) => {
            let endpoint = Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
            let web = WebSearcher::new(client, endpoint, config.search.max_results);
            run_provider(
                config,
                &storage,
                factory,
                CompositeSearcher::new(seeds, web),
                options,
            )
            .await
        }
        None => {
            run_provider(
                config,
                &storage,
                factory,
                CompositeSearcher::new(seeds, NullSearcher),
                options,
            )
            .await
        }
    };

    let status = match &outcome {
        Ok(Some(_)) => RunStatus::Completed,
        Ok(None) => RunStatus::Interrupted,
        Err(_) => RunStatus::Failed,
    };
    let delivered = storage
        .count_delivered_repositories()?
        .saturating_sub(delivered_before);
    storage.finish_run(run_id, status, delivered)?;
    tracing::info!(run_id, status = status.to_db_string(), delivered, "Run finished");

    outcome.map(|report| report.unwrap_or_default())
}

/// Drives a provider until done; `None` when interrupted
async fn run_provider<S: Searcher>(
    config: &Config,
    storage: &Arc<SqliteStorage>,
    factory: CgitScraperFactory,
    searcher: S,
    options: &RunOptions,
) -> Result<Option<RunReport>, RoverError> {
    let provider = Provider::new(factory, searcher, storage.clone(), storage.clone())
        .with_query(config.search.query.clone())
        .with_backoff(config.backoff.to_backoff_config());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    tokio::select! {
        report = drive(&provider, options, &mut out) => report.map(Some),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            Ok(None)
        }
    }
}
