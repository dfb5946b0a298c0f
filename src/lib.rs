//! cgit-rover: a source-discovery crawler for cgit index sites
//!
//! This crate discovers publicly reachable cgit installations, enumerates the
//! repositories they list, and hands each repository URL to a consumer exactly
//! once per durable store through a pull/acknowledge protocol.
//!
//! The heart of the crate is [`provider::Provider`]. It owns a roster of
//! per-site [`scraping::Scraper`]s, validates new candidate sites, and keeps
//! delivery state in the durable registries defined in [`storage`].

pub mod backoff;
pub mod config;
pub mod output;
pub mod provider;
pub mod robots;
pub mod runner;
pub mod scraping;
pub mod search;
pub mod storage;
pub mod url;

#[cfg(test)]
pub(crate) mod testutil;

use thiserror::Error;

/// Main error type for cgit-rover operations
#[derive(Debug, Error)]
pub enum RoverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for cgit-rover operations
pub type Result<T> = std::result::Result<T, RoverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::provider::{Ack, Provider, ProviderError};
pub use crate::scraping::RawRepository;
pub use crate::url::SourceUrl;
