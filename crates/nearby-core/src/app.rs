use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::{RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;

use nearby_flow::{FlowCoordinator, Presenter, RootFlow, RootStep};
use nearby_weather::{
    BackgroundFetchCompletion, ProviderConfig, RefreshCoordinator, RefreshOutcome, RefreshPolicy,
    RetryConfig, UserLocationService, WeatherCache, WeatherInformation, WeatherInformationService,
    WeatherProvider,
};

use crate::error::{AppError, ConfigError};
use crate::{BookmarkConfig, Config};

/// Composition root and lifecycle entry points.
///
/// Every service is built once here and handed to its consumers through
/// constructors; nothing is resolved at runtime.
pub struct App {
    config: RwLock<Config>,
    location: Arc<UserLocationService>,
    weather: Arc<WeatherInformationService>,
    refresh: RefreshCoordinator,
    shutdown: CancellationToken,
}

impl App {
    /// Load, validate and wire the application from the default config file
    pub fn load() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        Ok(Self::new(config)?)
    }

    /// Wire the application from an already loaded config
    pub fn new(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let provider = WeatherProvider::new(ProviderConfig {
            base_url: config.weather.api_base_url.clone(),
            api_key: config.weather.api_key.clone(),
            unit: config.weather.temperature_unit,
            timeout: Duration::from_secs(config.weather.request_timeout_secs),
            retry: RetryConfig::default(),
        })?;

        let location = Arc::new(UserLocationService::new());
        let weather = Arc::new(WeatherInformationService::new(
            Arc::new(provider),
            WeatherCache::open(&config.config_dir),
            location.clone(),
            config.bookmarked_stations(),
            config.weather.nearby_result_count,
        ));
        let refresh = RefreshCoordinator::new(weather.clone());

        tracing::info!(
            "App wired with {} bookmarks (api key: {})",
            config.bookmarks.len(),
            config.weather.has_api_key()
        );

        Ok(Self {
            config: RwLock::new(config),
            location,
            weather,
            refresh,
            shutdown: CancellationToken::new(),
        })
    }

    /// Current settings. Do not hold the guard across an await.
    pub fn config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read()
    }

    /// The host pushes location fixes and permission changes here
    pub fn location(&self) -> &UserLocationService {
        &self.location
    }

    pub fn weather(&self) -> &WeatherInformationService {
        &self.weather
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.config.read().refresh_policy()
    }

    /// Replace the bookmarks and the preferred bookmark.
    ///
    /// The new list is validated and written to the config file before the
    /// weather service drops cached results for removed stations.
    pub async fn set_bookmarks(
        &self,
        bookmarks: Vec<BookmarkConfig>,
        preferred: Option<u64>,
    ) -> Result<(), AppError> {
        let mut updated = self.config.read().clone();
        updated.bookmarks = bookmarks;
        updated.preferred_bookmark = preferred;

        let validation = updated.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        updated.save_to(&updated.file_path())?;

        let stations = updated.bookmarked_stations();
        *self.config.write() = updated;
        self.weather.set_bookmarks(stations).await?;
        Ok(())
    }

    /// Cached weather of the preferred bookmark, shown by the host as the app
    /// badge
    pub fn preferred_bookmark_weather(&self) -> Option<WeatherInformation> {
        let station_id = self.config.read().preferred_bookmark?;
        self.weather.bookmarked_weather(station_id)
    }

    /// Start navigation. Without an API key the welcome flow is shown on top
    /// of the main window.
    pub fn did_finish_launching<P: Presenter>(
        &self,
        presenter: P,
    ) -> Result<FlowCoordinator<RootFlow, P>, AppError> {
        let mut flow = FlowCoordinator::coordinate(RootFlow::new(), presenter)?;

        let has_api_key = self.config.read().weather.has_api_key();
        if !has_api_key {
            tracing::info!("No API key configured, starting onboarding");
            flow.stepper().emit(RootStep::Welcome)?;
        }
        flow.process()?;

        Ok(flow)
    }

    /// App became active: refresh when the persisted settings allow it.
    /// A shutdown in the meantime reports `Failure`.
    pub async fn did_become_active(&self) -> RefreshOutcome {
        let policy = self.refresh_policy();
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::info!("Refresh abandoned during shutdown");
                RefreshOutcome::Failure
            }
            outcome = self.refresh.refresh_if_due(policy) => outcome,
        }
    }

    /// Background fetch window granted by the platform.
    ///
    /// The configured budget bounds the fetch; when it runs out (or the app
    /// shuts down) the in-flight updates are dropped and `completion` reports
    /// `Failed`.
    pub async fn perform_fetch(&self, completion: BackgroundFetchCompletion) {
        let budget = Duration::from_secs(self.config.read().background.fetch_budget_secs);
        let fetch = self.refresh.background_fetch(self.refresh_policy(), completion);

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::info!("Background fetch abandoned during shutdown");
            }
            result = tokio::time::timeout(budget, fetch) => {
                if result.is_err() {
                    tracing::warn!("Background fetch exceeded its {:?} budget", budget);
                }
            }
        }
    }

    /// Cancel in-flight refreshes; safe to call more than once
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("Shutting down application");
            self.shutdown.cancel();
        }
    }
}
