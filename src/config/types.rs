use crate::backoff::BackoffConfig;
use crate::scraping::ScraperSettings;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for cgit-rover
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub backoff: BackoffSettings,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Where candidate sources come from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Query handed to the search endpoint
    pub query: String,

    /// HTML search endpoint, queried as `<endpoint>?q=<query>`
    pub endpoint: Option<String>,

    /// Candidate index sites checked on every discovery
    pub seeds: Vec<String>,

    /// Maximum number of distinct sites taken from one search
    #[serde(rename = "max-results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            endpoint: None,
            seeds: Vec::new(),
            max_results: 50,
        }
    }
}

/// Backoff applied to failing sources
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    pub factor: f64,

    pub jitter: bool,

    /// Consecutive failures before a source is abandoned; unset retries forever
    #[serde(rename = "max-attempts")]
    pub max_attempts: Option<u32>,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        let defaults = BackoffConfig::default();
        Self {
            min_delay_ms: defaults.min_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            factor: defaults.factor,
            jitter: defaults.jitter,
            max_attempts: defaults.max_attempts,
        }
    }
}

impl BackoffSettings {
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            factor: self.factor,
            jitter: self.jitter,
            max_attempts: self.max_attempts,
        }
    }
}

/// Scraper politeness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Minimum time between two page fetches of the same source (milliseconds)
    #[serde(rename = "minimum-time-between-pages")]
    pub minimum_time_between_pages: u64,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            minimum_time_between_pages: 1000,
            request_timeout_secs: 30,
            respect_robots: true,
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_settings(&self, user_agent: &UserAgentConfig) -> ScraperSettings {
        ScraperSettings {
            min_page_interval: Duration::from_millis(self.minimum_time_between_pages),
            respect_robots: self.respect_robots,
            robots_agent: user_agent.crawler_name.clone(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the registries
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Runner behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause before rediscovering when following (seconds)
    #[serde(rename = "idle-interval-secs")]
    pub idle_interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            idle_interval_secs: 3600,
        }
    }
}

impl RunConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }
}
