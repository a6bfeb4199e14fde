//! Weather API client for fetching soil and forecast data
//!
//! Integrates with the Open-Meteo forecast API (no API key required)

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use shared::{
    outlook_for, round_half_up, weather_condition, Coordinates, ForecastDay, SoilSnapshot,
    WeatherSnapshot,
};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Open-Meteo API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

/// Open-Meteo response for the soil query
#[derive(Debug, Deserialize)]
struct SoilResponse {
    current: SoilCurrent,
}

#[derive(Debug, Deserialize)]
struct SoilCurrent {
    soil_moisture_0_to_1cm: f64,
}

/// Open-Meteo response for the forecast query
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: ForecastCurrent,
    daily: ForecastDaily,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    temperature_2m: f64,
    weathercode: i32,
}

#[derive(Debug, Deserialize)]
struct ForecastDaily {
    time: Vec<String>,
    weathercode: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
}

impl WeatherClient {
    /// Create a new WeatherClient against the public API
    pub fn new() -> Self {
        Self::with_base_url("https://api.open-meteo.com/v1".to_string())
    }

    /// Create a new WeatherClient with custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch surface soil moisture and derive the soil snapshot
    pub async fn get_soil(&self, coords: Coordinates) -> AppResult<SoilSnapshot> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current=soil_moisture_0_to_1cm",
            self.base_url, coords.latitude, coords.longitude
        );

        let data: SoilResponse = self.get_json(&url).await?;

        Ok(SoilSnapshot::from_reading(
            data.current.soil_moisture_0_to_1cm,
            coords,
        ))
    }

    /// Fetch current conditions plus the 7-day forecast
    pub async fn get_forecast(&self, coords: Coordinates) -> AppResult<WeatherSnapshot> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current=temperature_2m,weathercode&daily=weathercode,temperature_2m_max&forecast_days=7&timezone=auto",
            self.base_url, coords.latitude, coords.longitude
        );

        let data: ForecastResponse = self.get_json(&url).await?;

        Ok(convert_forecast_response(data))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Weather API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Weather API error: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse weather response: {}", e)))
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert the Open-Meteo forecast response to our format
fn convert_forecast_response(data: ForecastResponse) -> WeatherSnapshot {
    let summary = format!(
        "{}°C, {}",
        round_half_up(data.current.temperature_2m) as i32,
        weather_condition(data.current.weathercode)
    );

    let forecast: Vec<ForecastDay> = data
        .daily
        .time
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let temp = data
                .daily
                .temperature_2m_max
                .get(index)
                .copied()
                .flatten()
                .map(|t| round_half_up(t) as i32)
                .unwrap_or_default();
            let condition = data
                .daily
                .weathercode
                .get(index)
                .copied()
                .flatten()
                .map(weather_condition)
                .unwrap_or("Unknown");

            ForecastDay::new(weekday_label(date), temp, condition)
        })
        .collect();

    WeatherSnapshot {
        summary,
        outlook: outlook_for(&forecast),
        forecast,
    }
}

/// Short weekday for an ISO date ("2024-06-03" -> "Mon"); unparseable dates pass through
fn weekday_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%a").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_label() {
        assert_eq!(weekday_label("2024-06-03"), "Mon");
        assert_eq!(weekday_label("2024-06-09"), "Sun");
        assert_eq!(weekday_label("soon"), "soon");
    }

    #[test]
    fn test_convert_forecast_response() {
        let data: ForecastResponse = serde_json::from_value(serde_json::json!({
            "current": {"temperature_2m": 27.6, "weathercode": 2},
            "daily": {
                "time": ["2024-06-03", "2024-06-04", "2024-06-05"],
                "weathercode": [0, 3, 63],
                "temperature_2m_max": [30.4, 31.5, null]
            }
        }))
        .unwrap();

        let weather = convert_forecast_response(data);
        assert_eq!(weather.summary, "28°C, Partly cloudy");
        assert_eq!(weather.forecast[0], ForecastDay::new("Mon", 30, "Clear sky"));
        assert_eq!(weather.forecast[1].temp, 32);
        assert_eq!(weather.forecast[2].condition, "Moderate rain");
        assert_eq!(weather.outlook, "Rain expected in 3 days.");
    }
}
