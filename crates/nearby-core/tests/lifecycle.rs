//! App lifecycle tests against a mocked OpenWeatherMap API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nearby_core::{App, BookmarkConfig, Config};
use nearby_flow::{Presenter, Screen, WindowLevel, WindowManager};
use nearby_weather::{BackgroundFetchCompletion, BackgroundFetchResult, Coordinates, RefreshOutcome};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn station_body(id: u64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "coord": { "lat": 52.5, "lon": 13.4 },
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky" }],
        "main": { "temp": 18.0, "feels_like": 17.0, "humidity": 40 },
        "wind": { "speed": 2.0 },
        "sys": { "country": "DE" },
        "dt": 1700000000
    })
}

fn config(dir: &TempDir, server: &MockServer, api_key: Option<&str>) -> Config {
    let mut config = Config::with_config_dir(dir.path().to_path_buf());
    config.weather.api_base_url = server.uri();
    config.weather.api_key = api_key.map(str::to_string);
    config.background.fetch_budget_secs = 1;
    config.bookmarks.push(BookmarkConfig {
        id: 2950159,
        name: "Berlin".to_string(),
        country: Some("DE".to_string()),
        latitude: 52.52,
        longitude: 13.41,
    });
    config
}

/// Completion that records every result it reports
fn recording_completion() -> (BackgroundFetchCompletion, Arc<Mutex<Vec<BackgroundFetchResult>>>) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    let completion = BackgroundFetchCompletion::new(move |result| sink.lock().unwrap().push(result));
    (completion, results)
}

async fn mount_station(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(station_body(2950159, "Berlin")))
        .mount(server)
        .await;
}

async fn mount_nearby(server: &MockServer, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [station_body(1, "Mitte")]
        }))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/data/2.5/find"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_launch_without_api_key_shows_welcome_and_skips_refresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, None)).unwrap();

    let flow = app.did_finish_launching(WindowManager::new()).unwrap();
    assert_eq!(flow.presenter().visible_screen(), Some(&Screen::Welcome));
    assert_eq!(flow.presenter().key_window(), Some(WindowLevel::Alert));
    assert!(flow.presenter().has_window(WindowLevel::Normal));

    assert_eq!(app.did_become_active().await, RefreshOutcome::Skipped);

    let (completion, results) = recording_completion();
    app.perform_fetch(completion).await;
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::Failed]);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_launch_with_api_key_shows_weather_list() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();

    let flow = app.did_finish_launching(WindowManager::new()).unwrap();
    assert_eq!(flow.presenter().visible_screen(), Some(&Screen::WeatherList));
    assert!(!flow.presenter().has_window(WindowLevel::Alert));
}

#[tokio::test]
async fn test_partial_failure_reports_failure() {
    let server = MockServer::start().await;
    mount_station(&server).await;
    mount_nearby(&server, 400).await;

    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();
    app.location().update(Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    });

    assert_eq!(app.did_become_active().await, RefreshOutcome::Failure);
    assert!(app.weather().cached().bookmarked.contains_key(&2950159));

    let (completion, results) = recording_completion();
    app.perform_fetch(completion).await;
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::Failed]);
}

#[tokio::test]
async fn test_full_refresh_succeeds() {
    let server = MockServer::start().await;
    mount_station(&server).await;
    mount_nearby(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();
    app.location().update(Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    });

    assert_eq!(app.did_become_active().await, RefreshOutcome::Success);
    assert_eq!(app.weather().cached().nearby.len(), 1);

    let (completion, results) = recording_completion();
    app.perform_fetch(completion).await;
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::NewData]);
}

#[tokio::test]
async fn test_refresh_disabled_still_allows_background_fetch() {
    let server = MockServer::start().await;
    mount_station(&server).await;
    mount_nearby(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let mut config = config(&dir, &server, Some("test-key"));
    config.weather.refresh_on_app_start = false;
    let app = App::new(config).unwrap();
    app.location().update(Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    });

    assert_eq!(app.did_become_active().await, RefreshOutcome::Skipped);
    assert!(server.received_requests().await.unwrap().is_empty());

    let (completion, results) = recording_completion();
    app.perform_fetch(completion).await;
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::NewData]);
}

#[tokio::test]
async fn test_shutdown_fails_pending_activation() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();

    app.shutdown();
    app.shutdown();

    assert_eq!(app.did_become_active().await, RefreshOutcome::Failure);

    let (completion, results) = recording_completion();
    app.perform_fetch(completion).await;
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::Failed]);
}

#[tokio::test]
async fn test_background_fetch_budget_expiry_reports_failed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(station_body(2950159, "Berlin"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();
    app.location().update(Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    });

    let (completion, results) = recording_completion();
    let started = std::time::Instant::now();
    app.perform_fetch(completion).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(*results.lock().unwrap(), vec![BackgroundFetchResult::Failed]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::with_config_dir(dir.path().to_path_buf());
    config.weather.nearby_result_count = 0;

    assert!(App::new(config).is_err());
}

#[tokio::test]
async fn test_preferred_bookmark_weather_follows_bookmark_changes() {
    let server = MockServer::start().await;
    mount_station(&server).await;
    mount_nearby(&server, 200).await;

    let dir = TempDir::new().unwrap();
    let app = App::new(config(&dir, &server, Some("test-key"))).unwrap();
    assert!(app.preferred_bookmark_weather().is_none());

    let berlin = app.config().bookmarks[0].clone();
    app.set_bookmarks(vec![berlin.clone()], Some(berlin.id))
        .await
        .unwrap();
    app.location().update(Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    });
    assert_eq!(app.did_become_active().await, RefreshOutcome::Success);

    let badge = app.preferred_bookmark_weather().unwrap();
    assert_eq!(badge.station_id, berlin.id);
    assert_eq!(badge.temperature, 18.0);

    app.set_bookmarks(Vec::new(), None).await.unwrap();
    assert!(app.preferred_bookmark_weather().is_none());
    assert!(app.weather().cached().bookmarked.is_empty());
}
