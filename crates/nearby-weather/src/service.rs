//! Weather information service: the two update operations behind a refresh.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::cache::{self, CachedWeather, WeatherCache};
use crate::location::UserLocationService;
use crate::provider::WeatherProvider;
use crate::refresh::WeatherUpdates;
use crate::types::{WeatherError, WeatherInformation, WeatherStation};

pub const DEFAULT_NEARBY_RESULT_COUNT: u8 = 10;

/// Fetches weather for bookmarks and the user's surroundings and keeps the
/// persistent cache current.
pub struct WeatherInformationService {
    provider: Arc<WeatherProvider>,
    cache: Mutex<WeatherCache>,
    /// Serializes cache writes so the newest snapshot always lands last
    save_lock: tokio::sync::Mutex<()>,
    location: Arc<UserLocationService>,
    bookmarks: RwLock<Vec<WeatherStation>>,
    nearby_count: u8,
}

impl WeatherInformationService {
    pub fn new(
        provider: Arc<WeatherProvider>,
        cache: WeatherCache,
        location: Arc<UserLocationService>,
        bookmarks: Vec<WeatherStation>,
        nearby_count: u8,
    ) -> Self {
        Self {
            provider,
            cache: Mutex::new(cache),
            save_lock: tokio::sync::Mutex::new(()),
            location,
            bookmarks: RwLock::new(bookmarks),
            nearby_count: nearby_count.max(1),
        }
    }

    pub fn bookmarks(&self) -> Vec<WeatherStation> {
        self.bookmarks.read().clone()
    }

    /// Replace the bookmark list and forget cached results for removed stations
    pub async fn set_bookmarks(&self, bookmarks: Vec<WeatherStation>) -> Result<(), WeatherError> {
        let ids: Vec<u64> = bookmarks.iter().map(|b| b.id).collect();
        *self.bookmarks.write() = bookmarks;

        self.cache.lock().retain_bookmarked(&ids);
        tracing::info!("Bookmarks replaced ({} stations)", ids.len());
        self.persist().await
    }

    /// Snapshot of everything cached so far
    pub fn cached(&self) -> CachedWeather {
        self.cache.lock().data().clone()
    }

    /// Last cached result for one bookmarked station
    pub fn bookmarked_weather(&self, station_id: u64) -> Option<WeatherInformation> {
        self.cache.lock().bookmarked(station_id).cloned()
    }

    /// Write the current cache contents on the blocking pool
    async fn persist(&self) -> Result<(), WeatherError> {
        let _writing = self.save_lock.lock().await;
        let (path, data) = {
            let cache = self.cache.lock();
            (cache.path().to_path_buf(), cache.data().clone())
        };

        tokio::task::spawn_blocking(move || cache::write_atomic(&path, &data))
            .await
            .map_err(|e| WeatherError::Task(e.to_string()))?
    }

    /// Refresh every bookmarked station concurrently.
    ///
    /// Successful results are persisted even when some stations fail; the
    /// operation as a whole fails with the first error seen.
    pub async fn update_bookmarked_weather(&self) -> Result<(), WeatherError> {
        let stations = self.bookmarks();
        if stations.is_empty() {
            tracing::debug!("No bookmarks, skipping bookmarked weather update");
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        for station in stations {
            let provider = self.provider.clone();
            tasks.spawn(async move {
                provider
                    .fetch_station(station.id)
                    .await
                    .map_err(|e| (station.name, e))
            });
        }

        let mut results = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(info)) => results.push(info),
                Ok(Err((name, e))) => {
                    tracing::warn!("Weather update for bookmark {} failed: {}", name, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::warn!("Bookmark update task failed: {}", e);
                    first_error.get_or_insert(WeatherError::Task(e.to_string()));
                }
            }
        }

        let stored = {
            let mut cache = self.cache.lock();
            // Bookmarks may have changed while the requests were in flight
            let current: HashSet<u64> = self.bookmarks.read().iter().map(|b| b.id).collect();
            results.retain(|info| current.contains(&info.station_id));
            let stored = results.len();
            if stored > 0 {
                cache.store_bookmarked(results);
            }
            stored
        };

        if stored > 0 {
            tracing::info!("Updated weather for {} bookmarks", stored);
            self.persist().await?;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Refresh the stations around the last known location
    pub async fn update_nearby_weather(&self) -> Result<(), WeatherError> {
        let coordinates = self.location.current()?;
        let results = self
            .provider
            .fetch_nearby(coordinates, self.nearby_count)
            .await?;

        tracing::info!("Updated weather for {} nearby stations", results.len());
        self.cache.lock().store_nearby(results);
        self.persist().await
    }
}

#[async_trait]
impl WeatherUpdates for WeatherInformationService {
    async fn update_bookmarked_weather(&self) -> Result<(), WeatherError> {
        WeatherInformationService::update_bookmarked_weather(self).await
    }

    async fn update_nearby_weather(&self) -> Result<(), WeatherError> {
        WeatherInformationService::update_nearby_weather(self).await
    }
}
