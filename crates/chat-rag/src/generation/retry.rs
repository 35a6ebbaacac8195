//! Bounded retry with exponential backoff for external API calls

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::MAX_GENERATION_RETRIES;
use crate::error::{Error, Result};

/// A failed attempt and whether another one may help
#[derive(Debug)]
pub enum Failure {
    /// Transient: network errors, 5xx, 408 and 429
    Retry(Error),
    /// Final: the request itself was rejected
    Abort(Error),
}

impl Failure {
    /// Classify an unsuccessful HTTP response
    pub fn from_status(status: StatusCode, error: Error) -> Self {
        if is_retryable_status(status) {
            Failure::Retry(error)
        } else {
            Failure::Abort(error)
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure::Retry(error)
    }
}

/// Client errors are final except request timeouts and rate limits
pub fn is_retryable_status(status: StatusCode) -> bool {
    !status.is_client_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Retry policy shared by the HTTP clients.
///
/// Attempt `n` (0-based) that fails waits `base_delay * 2^n` before the next one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; retries are capped at `MAX_GENERATION_RETRIES`
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.min(MAX_GENERATION_RETRIES),
            base_delay: Duration::from_secs(1),
        }
    }

    /// Override the first backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` until it succeeds, aborts, or the retries are used up
    pub async fn run<F, Fut, T>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Failure::Abort(e)) => {
                    tracing::warn!("{} rejected, not retrying: {}", label, e);
                    return Err(e);
                }
                Err(Failure::Retry(e)) => {
                    if attempt < self.max_retries {
                        let delay = self.base_delay * 2u32.pow(attempt);
                        tracing::warn!(
                            "{} failed (attempt {}/{}): {}, retrying in {:?}",
                            label,
                            attempt + 1,
                            self.max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal(format!("{} made no attempts", label))))
    }
}
