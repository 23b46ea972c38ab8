//! Persistent weather cache backed by a JSON file in the config directory.

use crate::types::{WeatherError, WeatherInformation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = "weather_cache.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedWeather {
    /// Latest result per bookmarked station id
    #[serde(default)]
    pub bookmarked: BTreeMap<u64, WeatherInformation>,
    #[serde(default)]
    pub bookmarked_updated_at: Option<DateTime<Utc>>,
    /// Stations around the user's location, nearest first
    #[serde(default)]
    pub nearby: Vec<WeatherInformation>,
    #[serde(default)]
    pub nearby_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct WeatherCache {
    cache_path: PathBuf,
    data: CachedWeather,
}

impl WeatherCache {
    /// Open the cache in `config_dir`, starting empty if the file is missing
    /// or unreadable.
    pub fn open(config_dir: &Path) -> Self {
        let cache_path = config_dir.join(CACHE_FILE_NAME);
        let data = match std::fs::read_to_string(&cache_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        "Discarding unreadable weather cache {}: {}",
                        cache_path.display(),
                        e
                    );
                    CachedWeather::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CachedWeather::default(),
            Err(e) => {
                tracing::warn!("Failed to read weather cache {}: {}", cache_path.display(), e);
                CachedWeather::default()
            }
        };

        Self { cache_path, data }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    pub fn data(&self) -> &CachedWeather {
        &self.data
    }

    pub fn bookmarked(&self, station_id: u64) -> Option<&WeatherInformation> {
        self.data.bookmarked.get(&station_id)
    }

    pub fn nearby(&self) -> &[WeatherInformation] {
        &self.data.nearby
    }

    /// Merge fresh bookmark results; stations not in `results` keep their
    /// previous entry.
    pub fn store_bookmarked(&mut self, results: Vec<WeatherInformation>) {
        for info in results {
            self.data.bookmarked.insert(info.station_id, info);
        }
        self.data.bookmarked_updated_at = Some(Utc::now());
    }

    /// Drop cached results for stations that are no longer bookmarked
    pub fn retain_bookmarked(&mut self, station_ids: &[u64]) {
        self.data
            .bookmarked
            .retain(|id, _| station_ids.contains(id));
    }

    pub fn store_nearby(&mut self, results: Vec<WeatherInformation>) {
        self.data.nearby = results;
        self.data.nearby_updated_at = Some(Utc::now());
    }

    /// Write the cache to disk via a temp file and rename
    pub fn save(&self) -> Result<(), WeatherError> {
        write_atomic(&self.cache_path, &self.data)
    }
}

/// Persist `data` at `path`. Blocking; async callers run it on the blocking pool.
pub(crate) fn write_atomic(path: &Path, data: &CachedWeather) -> Result<(), WeatherError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| WeatherError::Cache(format!("create {}: {}", parent.display(), e)))?;
    }

    let contents =
        serde_json::to_string_pretty(data).map_err(|e| WeatherError::Cache(e.to_string()))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)
        .map_err(|e| WeatherError::Cache(format!("write {}: {}", tmp_path.display(), e)))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| WeatherError::Cache(format!("rename {}: {}", tmp_path.display(), e)))?;

    Ok(())
}
