//! Reporting on the durable registries
//!
//! This module handles:
//! - Loading registry and run statistics from storage
//! - Rendering them for the `--stats` command

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, RoverStatistics};

use crate::storage::RunRecord;

/// Wall-clock duration of a finished run in seconds
pub fn run_duration_seconds(run: &RunRecord) -> Option<u64> {
    let started = run
        .started_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    let finished = run
        .finished_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;

    u64::try_from((finished - started).num_seconds()).ok()
}
