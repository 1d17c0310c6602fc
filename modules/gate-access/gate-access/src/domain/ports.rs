//! Output ports (capabilities) the domain depends on.
//!
//! Each is injected as `Arc<dyn ...>`; tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Key-value cache transport failure.
#[derive(Debug, Error)]
#[error("cache {operation} failed: {message}")]
pub struct CacheError {
    pub operation: &'static str,
    pub message: String,
}

impl CacheError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Shared key-value cache with per-entry TTL.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// All keys currently stored under `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

/// Output of one recognizer call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub success: bool,
    pub identifier: String,
    pub confidence: f64,
    pub error: Option<String>,
}

/// Recognizer failure, classified for retry decisions.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Connection refused, reset, DNS failure.
    #[error("recognizer transport error: {0}")]
    Transport(String),

    #[error("recognizer request timed out")]
    Timeout,

    /// Non-success HTTP status.
    #[error("recognizer returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("recognizer response could not be decoded: {0}")]
    Decode(String),
}

impl RecognizerError {
    /// Only network-level failures are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

/// External plate recognition service.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(
        &self,
        image_base64: &str,
        min_confidence: f64,
    ) -> Result<RecognitionResult, RecognizerError>;

    /// Liveness of the recognizer service.
    async fn health(&self) -> Result<(), RecognizerError>;
}

/// Source of "now" for validity checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_are_retryable() {
        assert!(RecognizerError::Transport("reset".to_owned()).is_retryable());
        assert!(RecognizerError::Timeout.is_retryable());
        assert!(
            !RecognizerError::Status {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!RecognizerError::Decode("eof".to_owned()).is_retryable());
    }
}
