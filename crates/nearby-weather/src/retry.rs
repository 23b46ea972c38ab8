//! Backoff for weather API requests.
//!
//! Each update operation owns its retries; the refresh coordinator above it
//! never retries. Retried: timeouts, connection failures, 5xx, 408 and 429.
//! Not retried: other 4xx (an invalid API key stays invalid).

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::types::WeatherError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 250;
pub const DEFAULT_MAX_DELAY_MS: u64 = 4000;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// No retries at all; used by tests and by callers with a tight budget
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay to wait before retry number `retry` (zero based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(is_retryable_status)
}

/// Run `request` until it yields a non-retryable response or retries run out.
///
/// A retryable status on the final attempt is returned as a response so the
/// caller can map it to a typed API error.
pub async fn with_retry<F, Fut>(config: &RetryConfig, request: F) -> Result<Response, WeatherError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.delay_for_retry(attempt - 1);
            tracing::debug!(
                "Weather request retry {} of {} in {:?}",
                attempt,
                config.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        match request().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < config.max_retries {
                    tracing::warn!("Weather API returned {}, retrying", status);
                    continue;
                }
                return Ok(response);
            }
            Err(e) if is_retryable_error(&e) => {
                tracing::warn!("Weather request attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!(
        "Weather request failed after {} attempts",
        config.max_retries + 1
    );
    match last_error {
        Some(e) => Err(e.into()),
        None => Err(WeatherError::Task("retries exhausted without a result".to_string())),
    }
}
