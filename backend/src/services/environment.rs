//! Environmental data service
//!
//! Resolves a free-text location to coordinates and fetches soil and weather
//! snapshots. Provider failures degrade to fixed fallback snapshots; callers
//! never see an error.

use async_trait::async_trait;
use shared::{Coordinates, SoilSnapshot, WeatherSnapshot};

use crate::external::WeatherClient;

#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    async fn fetch_soil(&self, location: &str) -> SoilSnapshot;
    async fn fetch_weather(&self, location: &str) -> WeatherSnapshot;
}

/// Open-Meteo backed environment service
#[derive(Clone)]
pub struct EnvironmentService {
    weather_client: WeatherClient,
}

impl EnvironmentService {
    pub fn new(weather_client: WeatherClient) -> Self {
        Self { weather_client }
    }
}

#[async_trait]
impl EnvironmentSource for EnvironmentService {
    async fn fetch_soil(&self, location: &str) -> SoilSnapshot {
        let coords = Coordinates::parse_or_default(location);

        match self.weather_client.get_soil(coords).await {
            Ok(soil) => {
                tracing::debug!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    moisture = soil.moisture,
                    "Fetched soil data"
                );
                soil
            }
            Err(e) => {
                tracing::warn!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    error = %e,
                    "Failed to fetch soil data, using fallback"
                );
                SoilSnapshot::fallback()
            }
        }
    }

    async fn fetch_weather(&self, location: &str) -> WeatherSnapshot {
        let coords = Coordinates::parse_or_default(location);

        match self.weather_client.get_forecast(coords).await {
            Ok(weather) => {
                tracing::debug!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    summary = %weather.summary,
                    "Fetched weather forecast"
                );
                weather
            }
            Err(e) => {
                tracing::warn!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    error = %e,
                    "Failed to fetch weather data, using fallback"
                );
                WeatherSnapshot::fallback()
            }
        }
    }
}
