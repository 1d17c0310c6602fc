//! Configuration for the gate access module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gate access module configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateAccessConfig {
    /// Minimum recognizer confidence (0.0..=1.0) for a plate to be trusted.
    pub min_confidence: f64,

    /// Time-to-live for cached allow-list/deny-list answers.
    #[serde(with = "humantime_serde")]
    pub list_cache_ttl: Duration,

    /// Maximum number of cached priority-list answers.
    pub list_cache_max_entries: u64,

    /// Upper bound for a single cache call.
    #[serde(with = "humantime_serde")]
    pub cache_timeout: Duration,

    /// Upper bound for a single store call.
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,

    /// How often expired list entries are swept. `0s` disables the sweeper.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    pub recognizer: RecognizerConfig,
}

impl Default for GateAccessConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            list_cache_ttl: Duration::from_secs(60 * 60),
            list_cache_max_entries: 100_000,
            cache_timeout: Duration::from_millis(200),
            store_timeout: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(15 * 60),
            recognizer: RecognizerConfig::default(),
        }
    }
}

impl GateAccessConfig {
    /// Checks value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be within 0.0..=1.0, got {}",
                self.min_confidence
            ));
        }
        if self.list_cache_ttl.is_zero() {
            return Err("list_cache_ttl must be greater than zero".to_owned());
        }
        if self.cache_timeout.is_zero() || self.store_timeout.is_zero() {
            return Err("cache_timeout and store_timeout must be greater than zero".to_owned());
        }
        self.recognizer.validate()
    }
}

/// HTTP recognizer client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerConfig {
    pub base_url: String,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Total attempts including the first one.
    pub max_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_owned(),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RecognizerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("recognizer.base_url must not be empty".to_owned());
        }
        if self.max_attempts == 0 {
            return Err("recognizer.max_attempts must be at least 1".to_owned());
        }
        if self.initial_backoff > self.max_backoff {
            return Err("recognizer.initial_backoff must not exceed max_backoff".to_owned());
        }
        Ok(())
    }
}
