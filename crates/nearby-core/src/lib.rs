pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{BackgroundConfig, BookmarkConfig, Config, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, UserMessage};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("NearbyWeather core initialized");
    Ok(())
}
