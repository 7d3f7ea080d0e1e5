//! Integration tests for LocatedFetcher against a mock Open-Meteo server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dss_weather::{
    AdviceTier, ConfiguredLocation, FetchStage, LocateOptions, LocatedFetcher, LocatedQuery,
    Location, LocationError, LocationProvider, UnavailableLocation, WeatherError,
    WeatherProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Denied;

#[async_trait]
impl LocationProvider for Denied {
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<Location, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

fn fetcher(server: &MockServer, location: Arc<dyn LocationProvider>) -> LocatedFetcher {
    let provider = WeatherProvider::with_base_url(&format!("{}/v1/forecast", server.uri())).unwrap();
    let options = LocateOptions {
        timeout: Duration::from_millis(200),
        ..LocateOptions::default()
    };
    LocatedFetcher::new(location, provider, options)
}

fn current_body(temperature: f64, humidity: f64, rain: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": -2.9,
        "longitude": -79.0,
        "current": {
            "time": "2026-10-19T10:00",
            "interval": 900,
            "temperature_2m": temperature,
            "relative_humidity_2m": humidity,
            "rain": rain
        }
    })
}

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "daily": {
            "time": ["2026-10-19", "2026-10-20", "2026-10-21", "2026-10-22", "2026-10-23", "2026-10-24", "2026-10-25"],
            "temperature_2m_max": [30.0, 28.0, 20.0, 25.0, 26.5, 19.0, 18.0],
            "temperature_2m_min": [15.0, 14.0, 9.0, 10.0, 12.0, 8.0, 7.0],
            "precipitation_probability_max": [60, 25, 10, 20, null, 0, 0]
        }
    })
}

#[tokio::test]
async fn test_current_conditions_at_device_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-0.18"))
        .and(query_param("longitude", "-78.47"))
        .and(query_param("current", "temperature_2m,relative_humidity_2m,rain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(14.2, 91.0, 0.4)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(ConfiguredLocation::new(-0.18, -78.47)));
    let located = fetcher.current_conditions().await.unwrap();

    assert!(!located.query.is_fallback_location);
    assert_eq!(located.data.temperature, 14.2);
    assert_eq!(located.data.humidity, 91.0);
    assert!(located.data.is_raining());
    assert_eq!(fetcher.stage(), FetchStage::DataFetched(located.query));
}

#[tokio::test]
async fn test_unavailable_location_queries_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-2.9001"))
        .and(query_param("longitude", "-79.0059"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(18.0, 60.0, 0.0)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));
    let located = fetcher.current_conditions().await.unwrap();

    assert_eq!(located.query, LocatedQuery::fallback(-2.9001, -79.0059));
    assert!(!located.data.is_raining());
    assert!(located.query.fallback_notice().is_some());
}

#[tokio::test]
async fn test_denied_location_queries_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-2.9001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(18.0, 60.0, 0.0)))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(Denied));
    let located = fetcher.current_conditions().await.unwrap();

    assert!(located.query.is_fallback_location);
    assert_eq!(located.query.latitude, -2.9001);
    assert_eq!(located.query.longitude, -79.0059);
}

#[tokio::test]
async fn test_forecast_advice_per_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param(
            "daily",
            "temperature_2m_max,temperature_2m_min,precipitation_probability_max",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));
    let located = fetcher.forecast().await.unwrap();

    let tiers: Vec<AdviceTier> = located.data.iter().map(|d| d.advisory.tier).collect();
    assert_eq!(
        tiers,
        vec![
            AdviceTier::Warning,
            AdviceTier::Danger,
            AdviceTier::Safe,
            AdviceTier::Safe,
            AdviceTier::Safe,
        ]
    );
    assert_eq!(located.data[4].day.rain_probability, 0.0);
}

#[tokio::test]
async fn test_forecast_with_missing_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "daily": {
                "time": ["2026-10-19", "2026-10-20", "2026-10-21", "2026-10-22", "2026-10-23"],
                "temperature_2m_max": [null, 28.0, 20.0, 25.0, 22.0],
                "temperature_2m_min": [null, 14.0, 9.0, 10.0, 8.0],
                "precipitation_probability_max": [40, 25, 10, 20, 50]
            }
        })))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));
    let located = fetcher.forecast().await.unwrap();

    assert_eq!(located.data.len(), 5);
    assert_eq!(located.data[0].day.max_temperature, None);
    assert_eq!(located.data[0].advisory.tier, AdviceTier::Safe);
    assert_eq!(located.data[1].advisory.tier, AdviceTier::Danger);
}

#[tokio::test]
async fn test_server_error_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));
    let err = fetcher.forecast().await.unwrap_err();

    assert!(matches!(err, WeatherError::Api { status: 503 }));
    assert_eq!(
        fetcher.stage(),
        FetchStage::Failed(LocatedQuery::fallback(-2.9001, -79.0059))
    );
}

#[tokio::test]
async fn test_malformed_body_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"hourly": {}})))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));
    let err = fetcher.current_conditions().await.unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Nothing listens on port 1
    let provider = WeatherProvider::with_base_url("http://127.0.0.1:1/v1/forecast").unwrap();
    let fetcher = LocatedFetcher::new(
        Arc::new(UnavailableLocation),
        provider,
        LocateOptions::default(),
    );

    let err = fetcher.current_conditions().await.unwrap_err();
    assert!(matches!(err, WeatherError::Network(_)));
}

#[tokio::test]
async fn test_subscriber_sees_final_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(18.0, 60.0, 0.0)))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(Denied));
    let mut stages = fetcher.subscribe();
    assert_eq!(*stages.borrow_and_update(), FetchStage::NotAttempted);

    fetcher.current_conditions().await.unwrap();

    assert!(stages.has_changed().unwrap());
    assert_eq!(
        *stages.borrow_and_update(),
        FetchStage::DataFetched(LocatedQuery::fallback(-2.9001, -79.0059))
    );
}

#[tokio::test]
async fn test_overlapping_runs_do_not_interleave() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current", "temperature_2m,relative_humidity_2m,rain"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param(
            "daily",
            "temperature_2m_max,temperature_2m_min,precipitation_probability_max",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, Arc::new(UnavailableLocation));

    let slow = async {
        let result = fetcher.current_conditions().await;
        (result.is_err(), Instant::now())
    };
    let fast = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = fetcher.forecast().await;
        (result.is_ok(), Instant::now(), fetcher.stage())
    };
    let ((slow_failed, slow_done), (fast_ok, fast_done, stage_after_fast)) =
        tokio::join!(slow, fast);

    assert!(slow_failed);
    assert!(fast_ok);
    // The forecast waited for the failing run, so its stage is the last one published
    assert!(slow_done <= fast_done);
    assert_eq!(
        stage_after_fast,
        FetchStage::DataFetched(LocatedQuery::fallback(-2.9001, -79.0059))
    );
    assert_eq!(fetcher.stage(), stage_after_fast);
}
