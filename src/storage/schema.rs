//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the cgit-rover database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track runs of the command-line runner
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    delivered_count INTEGER NOT NULL DEFAULT 0
);

-- Validated cgit index sites, keyed by scheme-less identity
CREATE TABLE IF NOT EXISTS known_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_key TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

-- Repositories acknowledged by a consumer
CREATE TABLE IF NOT EXISTS delivered_repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    source_key TEXT NOT NULL,
    name TEXT,
    description TEXT,
    delivered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_delivered_source ON delivered_repositories(source_key);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
