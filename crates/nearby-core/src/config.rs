use anyhow::{Context, Result};
use nearby_weather::{Coordinates, RefreshPolicy, TemperatureUnit, WeatherStation, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Schema written by this version; older files are migrated on load
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Largest result count the `find` endpoint accepts
pub const MAX_NEARBY_RESULT_COUNT: u8 = 50;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: u32,

    /// Directory holding config.toml and the weather cache
    pub config_dir: PathBuf,

    /// Bookmark whose weather the host shows on the app badge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_bookmark: Option<u64>,

    /// Where schema 0 kept the API key
    #[serde(default, rename = "api_key", skip_serializing)]
    legacy_api_key: Option<String>,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub background: BackgroundConfig,

    #[serde(default)]
    pub bookmarks: Vec<BookmarkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; onboarding asks for it when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Refresh bookmarked and nearby weather whenever the app becomes active
    #[serde(default = "default_refresh_on_app_start")]
    pub refresh_on_app_start: bool,

    #[serde(default = "default_nearby_result_count")]
    pub nearby_result_count: u8,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_refresh_on_app_start() -> bool {
    true
}

fn default_nearby_result_count() -> u8 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            temperature_unit: TemperatureUnit::default(),
            refresh_on_app_start: default_refresh_on_app_start(),
            nearby_result_count: default_nearby_result_count(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Time the host grants a background fetch before it gives up on it
    #[serde(default = "default_fetch_budget_secs")]
    pub fetch_budget_secs: u64,
}

fn default_fetch_budget_secs() -> u64 {
    25
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            fetch_budget_secs: default_fetch_budget_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkConfig {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl BookmarkConfig {
    pub fn to_station(&self) -> WeatherStation {
        WeatherStation {
            id: self.id,
            name: self.name.clone(),
            country: self.country.clone(),
            coordinates: Coordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_config_dir(default_config_dir())
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nearby-weather")
}

impl Config {
    /// Defaults rooted at `config_dir`
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            config_dir,
            preferred_bookmark: None,
            legacy_api_key: None,
            weather: WeatherConfig::default(),
            background: BackgroundConfig::default(),
            bookmarks: Vec::new(),
        }
    }

    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, creating a default file if missing and
    /// persisting any schema migration.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(default_config_dir);
            let config = Self::with_config_dir(config_dir);
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        if config.migrate() {
            tracing::info!("Migrated config to schema {}", CONFIG_SCHEMA_VERSION);
            config.save_to(path)?;
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Bring an older schema up to date. Returns true if anything changed.
    pub fn migrate(&mut self) -> bool {
        if self.schema_version >= CONFIG_SCHEMA_VERSION {
            return false;
        }

        if let Some(key) = self.legacy_api_key.take() {
            if !self.weather.has_api_key() {
                self.weather.api_key = Some(key);
            }
        }

        self.schema_version = CONFIG_SCHEMA_VERSION;
        true
    }

    /// Settings snapshot gating a refresh
    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            has_api_key: self.weather.has_api_key(),
            refresh_on_start_enabled: self.weather.refresh_on_app_start,
        }
    }

    pub fn bookmarked_stations(&self) -> Vec<WeatherStation> {
        self.bookmarks.iter().map(BookmarkConfig::to_station).collect()
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                "No API key configured - weather updates are disabled until onboarding completes",
            );
        }

        if self.weather.nearby_result_count == 0 {
            result.add_error(
                "weather.nearby_result_count",
                "Nearby result count must be greater than 0",
            );
        } else if self.weather.nearby_result_count > MAX_NEARBY_RESULT_COUNT {
            result.add_error(
                "weather.nearby_result_count",
                format!("Nearby result count must be at most {}", MAX_NEARBY_RESULT_COUNT),
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.background.fetch_budget_secs == 0 {
            result.add_error(
                "background.fetch_budget_secs",
                "Background fetch budget must be greater than 0",
            );
        } else if self.background.fetch_budget_secs > 30 {
            result.add_warning(
                "background.fetch_budget_secs",
                "Platforms rarely grant background fetches more than 30 seconds",
            );
        }

        let mut seen = HashSet::new();
        for (index, bookmark) in self.bookmarks.iter().enumerate() {
            let field = format!("bookmarks[{}]", index);
            if !seen.insert(bookmark.id) {
                result.add_error(&field, format!("Duplicate bookmark id {}", bookmark.id));
            }
            if !(-90.0..=90.0).contains(&bookmark.latitude) {
                result.add_error(&field, format!("Latitude out of range: {}", bookmark.latitude));
            }
            if !(-180.0..=180.0).contains(&bookmark.longitude) {
                result.add_error(&field, format!("Longitude out of range: {}", bookmark.longitude));
            }
        }

        if let Some(preferred) = self.preferred_bookmark {
            if !seen.contains(&preferred) {
                result.add_error(
                    "preferred_bookmark",
                    format!("Preferred bookmark {} is not bookmarked", preferred),
                );
            }
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Where this config lives on disk
    pub fn file_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nearby-weather");

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}
