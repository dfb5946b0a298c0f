//! Statistics generation from the registries
//!
//! This module provides functionality for extracting and displaying
//! discovery and delivery statistics from the storage layer.

use crate::output::run_duration_seconds;
use crate::storage::{RunRecord, Storage, StorageResult};
use std::fmt::Write;

/// Registry statistics summary
#[derive(Debug, Clone)]
pub struct RoverStatistics {
    /// Number of validated sources
    pub known_sources: u64,

    /// Number of repositories ever acknowledged
    pub delivered_repositories: u64,

    /// Delivered repositories per source, largest first
    pub delivered_by_source: Vec<(String, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<RoverStatistics> {
    Ok(RoverStatistics {
        known_sources: storage.count_known_sources()?,
        delivered_repositories: storage.count_delivered_repositories()?,
        delivered_by_source: storage.delivered_by_source()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Renders statistics as the text printed by `--stats`
pub fn format_statistics(stats: &RoverStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== cgit-rover Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Known sources: {}", stats.known_sources);
    let _ = writeln!(
        out,
        "  Delivered repositories: {}",
        stats.delivered_repositories
    );
    let _ = writeln!(out);

    if !stats.delivered_by_source.is_empty() {
        let _ = writeln!(out, "Delivered by Source:");
        for (source, count) in &stats.delivered_by_source {
            let percentage = if stats.delivered_repositories > 0 {
                (*count as f64 / stats.delivered_repositories as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(out, "  {}: {} ({:.1}%)", source, count, percentage);
        }
        let _ = writeln!(out);
    }

    match &stats.latest_run {
        Some(run) => {
            let _ = writeln!(out, "Latest Run (#{}):", run.id);
            let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                let _ = writeln!(out, "  Finished: {}", finished);
            }
            if let Some(seconds) = run_duration_seconds(run) {
                let _ = writeln!(out, "  Duration: {}s", seconds);
            }
            let _ = writeln!(out, "  Delivered: {}", run.delivered_count);
        }
        None => {
            let _ = writeln!(out, "No runs recorded yet.");
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &RoverStatistics) {
    print!("{}", format_statistics(stats));
}
