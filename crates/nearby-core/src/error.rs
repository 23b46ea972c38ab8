//! Centralized error types for the NearbyWeather application.
//!
//! Each crate keeps its own typed errors; `AppError` wraps them at the
//! composition root and maps every case to a message suitable for the UI.

use nearby_flow::FlowError;
use nearby_weather::{LocationError, WeatherError};
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] FlowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// UI-appropriate, non-technical description of an error
pub trait UserMessage {
    fn user_message(&self) -> &'static str;
}

impl UserMessage for AppError {
    fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Navigation(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl UserMessage for ConfigError {
    fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

impl UserMessage for WeatherError {
    fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(e) if e.is_timeout() => "The request timed out. Please try again.",
            WeatherError::Network(_) => "Unable to connect. Check your internet connection.",
            WeatherError::Location(e) => e.user_message(),
            WeatherError::MissingApiKey => "Add an API key in settings to load weather data.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::Api { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            WeatherError::Api { .. } => "Weather service error. Please try again.",
            WeatherError::Parse(_) => "Received an unexpected response. Please try again.",
            WeatherError::Cache(_) => "Weather data may be outdated.",
            WeatherError::Task(_) => "Weather update was interrupted. Please try again.",
        }
    }
}

impl UserMessage for LocationError {
    fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "Allow location access to see nearby weather.",
            LocationError::ServiceUnavailable => "Your location is not available yet.",
            LocationError::Other(_) => "Your location could not be determined.",
        }
    }
}

impl UserMessage for FlowError {
    fn user_message(&self) -> &'static str {
        match self {
            FlowError::NoWindow(_) | FlowError::Unsettled { .. } => {
                "Something went wrong showing this screen. Try restarting the app."
            }
            FlowError::CoordinatorGone { .. } => "This screen is no longer available.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = WeatherError::InvalidApiKey.into();
        assert!(matches!(app_err, AppError::Weather(WeatherError::InvalidApiKey)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Weather(WeatherError::Location(LocationError::PermissionDenied));
        assert_eq!(
            app_err.user_message(),
            "Allow location access to see nearby weather."
        );
    }

    #[test]
    fn test_server_errors_get_their_own_message() {
        let server = WeatherError::Api {
            status: 503,
            message: "down".into(),
        };
        let client = WeatherError::Api {
            status: 404,
            message: "city not found".into(),
        };
        assert_ne!(server.user_message(), client.user_message());
    }

    #[test]
    fn test_navigation_errors_have_messages() {
        let err: AppError = FlowError::Unsettled { rounds: 64 }.into();
        assert!(!err.user_message().is_empty());
    }
}
