//! Refresh coordination on app activation and background fetch.
//!
//! A refresh cycle runs the bookmarked and nearby updates side by side and
//! folds their terminal states into a single all-or-nothing outcome. Failure
//! reasons are logged here and never cross the aggregate boundary.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::WeatherError;

/// The two update operations a refresh cycle fans out to
#[async_trait]
pub trait WeatherUpdates: Send + Sync {
    async fn update_bookmarked_weather(&self) -> Result<(), WeatherError>;
    async fn update_nearby_weather(&self) -> Result<(), WeatherError>;
}

/// Snapshot of the persisted settings that gate a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshPolicy {
    pub has_api_key: bool,
    pub refresh_on_start_enabled: bool,
}

impl RefreshPolicy {
    pub fn is_due(&self) -> bool {
        self.has_api_key && self.refresh_on_start_enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Both updates succeeded
    Success,
    /// At least one update failed
    Failure,
    /// The policy did not allow a refresh; nothing ran
    Skipped,
}

impl RefreshOutcome {
    fn from_results(bookmarked: &Result<(), WeatherError>, nearby: &Result<(), WeatherError>) -> Self {
        if bookmarked.is_ok() && nearby.is_ok() {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result reported to the platform for a background fetch window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFetchResult {
    NewData,
    Failed,
}

impl From<RefreshOutcome> for BackgroundFetchResult {
    fn from(outcome: RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Success => Self::NewData,
            RefreshOutcome::Failure | RefreshOutcome::Skipped => Self::Failed,
        }
    }
}

type CompletionHandler = Box<dyn FnOnce(BackgroundFetchResult) + Send>;

/// Platform completion callback that fires exactly once.
///
/// Dropping it without calling `complete` (for example when the host's time
/// budget cancels the fetch future) reports `Failed`.
pub struct BackgroundFetchCompletion {
    handler: Option<CompletionHandler>,
}

impl BackgroundFetchCompletion {
    pub fn new(handler: impl FnOnce(BackgroundFetchResult) + Send + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
        }
    }

    pub fn complete(mut self, result: BackgroundFetchResult) {
        if let Some(handler) = self.handler.take() {
            handler(result);
        }
    }
}

impl fmt::Debug for BackgroundFetchCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundFetchCompletion")
            .field("pending", &self.handler.is_some())
            .finish()
    }
}

impl Drop for BackgroundFetchCompletion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            tracing::warn!("Background fetch ended before the refresh settled");
            handler(BackgroundFetchResult::Failed);
        }
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    updates: Arc<dyn WeatherUpdates>,
}

impl RefreshCoordinator {
    pub fn new(updates: Arc<dyn WeatherUpdates>) -> Self {
        Self { updates }
    }

    /// Refresh when the policy allows it, otherwise return `Skipped` without
    /// touching the network.
    pub async fn refresh_if_due(&self, policy: RefreshPolicy) -> RefreshOutcome {
        if !policy.is_due() {
            tracing::debug!(
                "Refresh not due (api key: {}, refresh on start: {})",
                policy.has_api_key,
                policy.refresh_on_start_enabled
            );
            return RefreshOutcome::Skipped;
        }
        self.refresh().await
    }

    /// Run both updates concurrently and wait for both to settle
    pub async fn refresh(&self) -> RefreshOutcome {
        let (bookmarked, nearby) = tokio::join!(
            self.updates.update_bookmarked_weather(),
            self.updates.update_nearby_weather()
        );

        if let Err(e) = &bookmarked {
            tracing::warn!("Bookmarked weather update failed: {}", e);
        }
        if let Err(e) = &nearby {
            tracing::warn!("Nearby weather update failed: {}", e);
        }

        let outcome = RefreshOutcome::from_results(&bookmarked, &nearby);
        tracing::info!("Weather refresh finished: {}", outcome);
        outcome
    }

    /// Background fetch entry point. Only the API key gates it; the
    /// refresh-on-start preference applies to foreground activation.
    pub async fn background_fetch(&self, policy: RefreshPolicy, completion: BackgroundFetchCompletion) {
        let outcome = if policy.has_api_key {
            self.refresh().await
        } else {
            tracing::debug!("Background fetch without api key, nothing to do");
            RefreshOutcome::Skipped
        };
        completion.complete(outcome.into());
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator").finish_non_exhaustive()
    }
}
