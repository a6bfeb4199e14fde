//! Environment service tests
//!
//! Runs the Open-Meteo client against a local fixture server:
//! - soil moisture is scaled and classified
//! - forecasts are summarised with weekday labels and a rain outlook
//! - provider failures fall back to fixed snapshots

mod common;

use agrox_server::external::WeatherClient;
use agrox_server::services::{EnvironmentService, EnvironmentSource};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use common::spawn_server;
use proptest::prelude::*;
use serde_json::{json, Value};
use shared::{Fertility, ForecastDay, SoilHealthStatus, SoilSnapshot, WeatherSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Queries = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn forecast_fixture(
    State(queries): State<Queries>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let is_soil = params
        .get("current")
        .is_some_and(|c| c.contains("soil_moisture_0_to_1cm"));
    queries.lock().unwrap().push(params);

    if is_soil {
        return Json(json!({
            "current": {"time": "2024-06-03T10:00", "soil_moisture_0_to_1cm": 0.75}
        }));
    }

    Json(json!({
        "current": {"temperature_2m": 27.6, "weathercode": 2},
        "daily": {
            "time": [
                "2024-06-03", "2024-06-04", "2024-06-05", "2024-06-06",
                "2024-06-07", "2024-06-08", "2024-06-09"
            ],
            "weathercode": [0, 2, 3, 61, 80, null, 1],
            "temperature_2m_max": [30.4, 31.5, 29.0, 26.2, 25.0, null, 28.8]
        }
    }))
}

async fn fixture_service() -> (EnvironmentService, Queries) {
    let queries: Queries = Arc::default();
    let app = Router::new()
        .route("/forecast", get(forecast_fixture))
        .with_state(queries.clone());
    let base_url = spawn_server(app).await;

    (
        EnvironmentService::new(WeatherClient::with_base_url(base_url)),
        queries,
    )
}

async fn failing_service() -> EnvironmentService {
    let app = Router::new().route(
        "/forecast",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable") }),
    );
    let base_url = spawn_server(app).await;
    EnvironmentService::new(WeatherClient::with_base_url(base_url))
}

// ============================================================================
// Soil
// ============================================================================

#[tokio::test]
async fn test_soil_moisture_is_scaled_and_classified() {
    let (service, queries) = fixture_service().await;

    let soil = service.fetch_soil("18.79, 98.98").await;

    assert_eq!(soil.moisture, 75);
    assert_eq!(soil.health_status, SoilHealthStatus::Excellent);
    assert_eq!(soil.fertility, Fertility::High);
    assert_eq!(soil.ph, 6.8);

    let queries = queries.lock().unwrap();
    assert_eq!(queries[0]["latitude"], "18.79");
    assert_eq!(queries[0]["longitude"], "98.98");
}

#[tokio::test]
async fn test_unparseable_location_uses_default_coordinates() {
    let (service, queries) = fixture_service().await;

    service.fetch_soil("my farm near the river").await;

    let queries = queries.lock().unwrap();
    assert_eq!(queries[0]["latitude"], "34.05");
    assert_eq!(queries[0]["longitude"], "-118.24");
}

#[tokio::test]
async fn test_soil_failure_returns_fallback() {
    let service = failing_service().await;

    assert_eq!(service.fetch_soil("18.79,98.98").await, SoilSnapshot::fallback());
}

// ============================================================================
// Weather
// ============================================================================

#[tokio::test]
async fn test_forecast_is_summarised() {
    let (service, queries) = fixture_service().await;

    let weather = service.fetch_weather("18.79,98.98").await;

    assert_eq!(weather.summary, "28°C, Partly cloudy");
    assert_eq!(weather.forecast.len(), 7);
    assert_eq!(weather.forecast[0], ForecastDay::new("Mon", 30, "Clear sky"));
    assert_eq!(weather.forecast[3], ForecastDay::new("Thu", 26, "Slight rain"));
    assert_eq!(weather.forecast[5], ForecastDay::new("Sat", 0, "Unknown"));
    assert_eq!(weather.outlook, "Rain expected in 4 days.");

    let queries = queries.lock().unwrap();
    assert_eq!(queries[0]["forecast_days"], "7");
    assert_eq!(queries[0]["timezone"], "auto");
}

#[tokio::test]
async fn test_forecast_failure_returns_fallback() {
    let service = failing_service().await;

    let weather = service.fetch_weather("18.79,98.98").await;

    assert_eq!(weather, WeatherSnapshot::fallback());
    assert_eq!(weather.summary, "20°C, Sunny");
    assert_eq!(weather.outlook, "Rain expected in 5 days.");
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Any location text yields snapshots, even with the provider unreachable
    #[test]
    fn prop_environment_never_fails(location in ".{0,40}") {
        let service = EnvironmentService::new(WeatherClient::with_base_url(
            "http://127.0.0.1:9".to_string(),
        ));

        let (soil, weather) = tokio_test::block_on(async {
            tokio::join!(service.fetch_soil(&location), service.fetch_weather(&location))
        });

        prop_assert_eq!(soil, SoilSnapshot::fallback());
        prop_assert_eq!(weather, WeatherSnapshot::fallback());
    }
}
