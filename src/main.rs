//! cgit-rover main entry point
//!
//! This is the command-line interface for the cgit-rover source-discovery crawler.

use anyhow::Context;
use cgit_rover::config::{load_config_with_hash, Config};
use cgit_rover::runner::{run, RunOptions};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// cgit-rover: discovers cgit installations and lists their repositories
///
/// Every repository URL not delivered in an earlier run is printed to stdout,
/// one per line. Known sites and delivered repositories are kept in the
/// configured SQLite database.
#[derive(Parser, Debug)]
#[command(name = "cgit-rover")]
#[command(version)]
#[command(about = "Discovers cgit sites and streams their repositories", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be searched without touching the network
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Stop after delivering this many repositories
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Keep running: after catching up, wait and search again
    #[arg(long)]
    follow: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }
    if cli.stats {
        return handle_stats(&config);
    }

    let options = RunOptions {
        limit: cli.limit,
        follow: cli.follow,
        idle_interval: config.run.idle_interval(),
    };

    let report = run(&config, &config_hash, &options)
        .await
        .context("Run failed")?;

    tracing::info!(
        delivered = report.delivered,
        fetch_failures = report.fetch_failures,
        abandoned_sources = report.abandoned_sources,
        "Done"
    );
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries only repository URLs.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cgit_rover=info,warn"),
            1 => EnvFilter::new("cgit_rover=debug,info"),
            2 => EnvFilter::new("cgit_rover=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== cgit-rover Dry Run ===\n");

    println!("Search:");
    match &config.search.endpoint {
        Some(endpoint) => {
            println!("  Endpoint: {}", endpoint);
            println!("  Query: {}", config.search.query);
            println!("  Max results: {}", config.search.max_results);
        }
        None => println!("  Endpoint: none (seeds and known sources only)"),
    }
    println!("  Seeds ({}):", config.search.seeds.len());
    for seed in &config.search.seeds {
        println!("    * {}", seed);
    }

    let backoff = &config.backoff;
    println!("\nBackoff:");
    println!(
        "  Delay: {}ms .. {}ms, factor {}, jitter {}",
        backoff.min_delay_ms, backoff.max_delay_ms, backoff.factor, backoff.jitter
    );
    match backoff.max_attempts {
        Some(max) => println!("  Abandon a source after {} consecutive failures", max),
        None => println!("  Failing sources are retried forever"),
    }

    println!("\nScraper:");
    println!(
        "  Minimum time between pages: {}ms",
        config.scraper.minimum_time_between_pages
    );
    println!("  Request timeout: {}s", config.scraper.request_timeout_secs);
    println!("  Respect robots.txt: {}", config.scraper.respect_robots);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use cgit_rover::output::{load_statistics, print_statistics};
    use cgit_rover::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}
