//! OpenWeatherMap client for station and nearby lookups.

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, TemperatureUnit, WeatherCondition, WeatherError, WeatherInformation};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "NearbyWeather/0.1.0";

/// Settings the provider is built from
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub unit: TemperatureUnit,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            unit: TemperatureUnit::default(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    unit: TemperatureUnit,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct OwmCurrent {
    id: u64,
    name: String,
    coord: OwmCoord,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: OwmMain,
    wind: Option<OwmWind>,
    sys: Option<OwmSys>,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct OwmCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmFind {
    #[serde(default)]
    list: Vec<OwmCurrent>,
}

#[derive(Debug, Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

impl From<OwmCurrent> for WeatherInformation {
    fn from(raw: OwmCurrent) -> Self {
        // Only the primary condition drives the category
        let condition_code = raw.weather.first().map(|c| c.id).unwrap_or(800);

        Self {
            station_id: raw.id,
            station_name: raw.name,
            country: raw.sys.and_then(|s| s.country),
            coordinates: Coordinates {
                latitude: raw.coord.lat,
                longitude: raw.coord.lon,
            },
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity: raw.main.humidity.clamp(0.0, 100.0).round() as u8,
            wind_speed: raw.wind.map(|w| w.speed).unwrap_or_default(),
            condition: WeatherCondition::from_owm_code(condition_code),
            condition_code,
            observed_at: DateTime::<Utc>::from_timestamp(raw.dt, 0).unwrap_or_else(Utc::now),
        }
    }
}

impl WeatherProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
            unit: config.unit,
            retry: config.retry,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    /// Current conditions for a single station id
    pub async fn fetch_station(&self, station_id: u64) -> Result<WeatherInformation, WeatherError> {
        let api_key = self.api_key()?;
        let url = format!("{}/data/2.5/weather", self.base_url);
        let query = [
            ("id", station_id.to_string()),
            ("units", self.unit.api_units().to_string()),
            ("appid", api_key.to_string()),
        ];

        let response = with_retry(&self.retry, || self.client.get(&url).query(&query).send()).await?;
        let current: OwmCurrent = decode(response).await?;

        tracing::debug!("Fetched weather for station {} ({})", current.id, current.name);
        Ok(current.into())
    }

    /// Up to `count` stations around `coordinates`, nearest first
    pub async fn fetch_nearby(
        &self,
        coordinates: Coordinates,
        count: u8,
    ) -> Result<Vec<WeatherInformation>, WeatherError> {
        let api_key = self.api_key()?;
        let url = format!("{}/data/2.5/find", self.base_url);
        let query = [
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
            ("cnt", count.to_string()),
            ("units", self.unit.api_units().to_string()),
            ("appid", api_key.to_string()),
        ];

        let response = with_retry(&self.retry, || self.client.get(&url).query(&query).send()).await?;
        let found: OwmFind = decode(response).await?;

        tracing::debug!(
            "Fetched {} nearby stations around {}, {}",
            found.list.len(),
            coordinates.latitude,
            coordinates.longitude
        );
        Ok(found.list.into_iter().map(WeatherInformation::from).collect())
    }

    fn api_key(&self) -> Result<&str, WeatherError> {
        self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WeatherError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(WeatherError::InvalidApiKey);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OwmErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(text);
        return Err(WeatherError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| WeatherError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_station(json: serde_json::Value) -> OwmCurrent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_conversion_uses_primary_condition() {
        let info: WeatherInformation = raw_station(serde_json::json!({
            "id": 2950159,
            "name": "Berlin",
            "coord": { "lat": 52.52, "lon": 13.41 },
            "weather": [{ "id": 501 }, { "id": 800 }],
            "main": { "temp": 12.5, "feels_like": 11.0, "humidity": 81 },
            "wind": { "speed": 4.1 },
            "sys": { "country": "DE" },
            "dt": 1700000000
        }))
        .into();

        assert_eq!(info.station_id, 2950159);
        assert_eq!(info.condition, WeatherCondition::Rain);
        assert_eq!(info.condition_code, 501);
        assert_eq!(info.humidity, 81);
        assert_eq!(info.country.as_deref(), Some("DE"));
        assert_eq!(info.observed_at.timestamp(), 1700000000);
    }

    #[test]
    fn test_conversion_tolerates_missing_optional_sections() {
        let info: WeatherInformation = raw_station(serde_json::json!({
            "id": 1,
            "name": "Nowhere",
            "coord": { "lat": 0.0, "lon": 0.0 },
            "main": { "temp": 1.0, "feels_like": 1.0, "humidity": 140 },
            "dt": 0
        }))
        .into();

        assert_eq!(info.condition, WeatherCondition::Clear);
        assert_eq!(info.wind_speed, 0.0);
        assert_eq!(info.humidity, 100);
        assert!(info.country.is_none());
    }

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let provider = WeatherProvider::new(ProviderConfig {
            api_key: Some("   ".to_string()),
            ..ProviderConfig::default()
        })
        .unwrap();
        assert!(!provider.has_api_key());
    }

    #[tokio::test]
    async fn test_fetch_without_api_key_fails_fast() {
        let provider = WeatherProvider::new(ProviderConfig::default()).unwrap();
        let err = provider.fetch_station(42).await.unwrap_err();
        assert!(matches!(err, WeatherError::MissingApiKey));
    }
}
