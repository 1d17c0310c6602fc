//! HTTP client for the external plate recognizer.
//!
//! `POST {base_url}/api/v1/recognize` with `{image_base64, min_confidence}`,
//! `GET {base_url}/health` for liveness. Transport failures and timeouts are
//! retried with capped exponential backoff; everything else fails at once.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RecognizerConfig;
use crate::domain::ports::{RecognitionResult, Recognizer, RecognizerError};

/// Max response body kept in a `Status` error.
const ERROR_BODY_PREVIEW: usize = 512;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `initial * 2^retry`, capped.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl From<&RecognizerConfig> for RetryPolicy {
    fn from(cfg: &RecognizerConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_backoff: cfg.initial_backoff,
            max_backoff: cfg.max_backoff,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    image_base64: &'a str,
    min_confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    success: bool,
    #[serde(default)]
    license_plate: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    processing_time_ms: Option<f64>,
}

/// Recognizer reached over HTTP.
pub struct HttpRecognizer {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpRecognizer {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: &RecognizerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            retry: RetryPolicy::from(cfg),
        })
    }

    async fn recognize_once(
        &self,
        request: &RecognizeRequest<'_>,
    ) -> Result<RecognitionResult, RecognizerError> {
        let response = self
            .client
            .post(format!("{}/api/v1/recognize", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizerError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| RecognizerError::Decode(e.to_string()))?;
        debug!(
            success = body.success,
            confidence = body.confidence,
            processing_time_ms = body.processing_time_ms,
            "Recognizer responded"
        );

        Ok(RecognitionResult {
            success: body.success,
            identifier: body.license_plate.unwrap_or_default(),
            confidence: body.confidence.unwrap_or_default(),
            error: body.error,
        })
    }
}

fn classify(e: reqwest::Error) -> RecognizerError {
    if e.is_timeout() {
        RecognizerError::Timeout
    } else if e.is_decode() {
        RecognizerError::Decode(e.to_string())
    } else {
        RecognizerError::Transport(e.to_string())
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    #[tracing::instrument(skip_all, fields(base_url = %self.base_url))]
    async fn recognize(
        &self,
        image_base64: &str,
        min_confidence: f64,
    ) -> Result<RecognitionResult, RecognizerError> {
        let request = RecognizeRequest {
            image_base64,
            min_confidence,
        };

        let mut attempt = 1;
        loop {
            match self.recognize_once(&request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_for(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Recognizer call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health(&self) -> Result<(), RecognizerError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RecognizerError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}
