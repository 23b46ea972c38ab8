//! Weather data for NearbyWeather
//!
//! Fetches current conditions for bookmarked stations and the stations around
//! the user from an OpenWeatherMap-compatible API, keeps them in a persistent
//! cache, and coordinates refresh cycles on app activation and background fetch.

pub mod cache;
pub mod location;
pub mod provider;
pub mod refresh;
pub mod retry;
pub mod service;
pub mod types;

pub use cache::{CachedWeather, WeatherCache};
pub use location::UserLocationService;
pub use provider::{ProviderConfig, WeatherProvider, DEFAULT_API_BASE_URL};
pub use refresh::{
    BackgroundFetchCompletion, BackgroundFetchResult, RefreshCoordinator, RefreshOutcome,
    RefreshPolicy, WeatherUpdates,
};
pub use retry::RetryConfig;
pub use service::{WeatherInformationService, DEFAULT_NEARBY_RESULT_COUNT};
pub use types::*;
