//! Configuration module for cgit-rover
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cgit_rover::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("rover.toml")).unwrap();
//! println!("Searching for: {}", config.search.query);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffSettings, Config, OutputConfig, RunConfig, ScraperConfig, SearchConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
