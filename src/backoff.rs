//! Exponential backoff for persistently failing sources
//!
//! The provider charges one attempt per delivery-time fetch failure and
//! resets the counter on the next successful delivery. The computed delay is
//! surfaced to the caller, who decides whether and how long to wait.

use rand::Rng;
use std::time::Duration;

/// Configuration for exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay for the first failure.
    pub min_delay: Duration,

    /// Cap for exponential growth.
    pub max_delay: Duration,

    /// Multiplier applied per failure (>= 1.0).
    pub factor: f64,

    /// Spread each delay randomly between the previous and the current step.
    pub jitter: bool,

    /// Consecutive failures after which a source is abandoned. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl BackoffConfig {
    /// Computes the un-jittered delay for the given attempt (0-indexed).
    ///
    /// The delay grows exponentially: `min_delay * factor^attempt`, capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_secs = self.min_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        if capped_secs.is_finite() {
            Duration::from_secs_f64(capped_secs)
        } else {
            self.max_delay
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            factor: 2.0,
            jitter: true,
            max_attempts: None,
        }
    }
}

/// Stateful exponential backoff counter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of failures recorded since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Clears the failure count after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Records one failure and returns how long to wait before retrying.
    ///
    /// With jitter enabled the delay for attempt `n` is drawn from
    /// `[delay(n - 1), delay(n)]`, so successive delays never shrink.
    pub fn next_delay(&mut self) -> Duration {
        let upper = self.config.delay_for_attempt(self.attempt);
        let delay = if self.config.jitter {
            let lower = match self.attempt {
                0 => self.config.min_delay.min(upper) / 2,
                n => self.config.delay_for_attempt(n - 1),
            };
            lower + jitter(upper.saturating_sub(lower))
        } else {
            upper
        };

        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// True once the configured attempt cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.config
            .max_attempts
            .is_some_and(|max| self.attempt >= max)
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

fn jitter(range: Duration) -> Duration {
    let range_ms = range.as_millis() as u64;
    if range_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=range_ms))
}
