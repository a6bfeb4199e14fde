//! Weather data models

use serde::{Deserialize, Serialize};

/// One day of the 7-day forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForecastDay {
    /// Short weekday label, e.g. "Mon"
    pub day: String,
    /// Daily maximum temperature in °C
    pub temp: i32,
    pub condition: String,
}

impl ForecastDay {
    pub fn new(day: impl Into<String>, temp: i32, condition: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            temp,
            condition: condition.into(),
        }
    }

    /// Whether the condition text announces precipitation
    pub fn is_wet(&self) -> bool {
        let condition = self.condition.to_lowercase();
        condition.contains("rain") || condition.contains("showers") || condition.contains("thunderstorm")
    }
}

/// Current conditions plus the multi-day forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeatherSnapshot {
    pub summary: String,
    pub outlook: String,
    pub forecast: Vec<ForecastDay>,
}

impl WeatherSnapshot {
    /// Snapshot used when the provider cannot be reached
    pub fn fallback() -> Self {
        Self {
            summary: "20°C, Sunny".to_string(),
            outlook: "Rain expected in 5 days.".to_string(),
            forecast: vec![
                ForecastDay::new("Mon", 20, "Sunny"),
                ForecastDay::new("Tue", 21, "Sunny"),
                ForecastDay::new("Wed", 22, "Partly Cloudy"),
                ForecastDay::new("Thu", 21, "Partly Cloudy"),
                ForecastDay::new("Fri", 19, "Showers"),
                ForecastDay::new("Sat", 18, "Rain"),
                ForecastDay::new("Sun", 20, "Sunny"),
            ],
        }
    }
}

/// Describe the forecast in relative-day language.
///
/// Looks for the first wet day; without one, reports the second day's
/// conditions (or the first day's if only one is known).
pub fn outlook_for(forecast: &[ForecastDay]) -> String {
    match forecast.iter().position(ForecastDay::is_wet) {
        Some(0) => "Rain expected today.".to_string(),
        Some(1) => "Rain expected tomorrow.".to_string(),
        Some(index) => format!("Rain expected in {} days.", index + 1),
        None => {
            let condition = forecast
                .get(1)
                .or_else(|| forecast.first())
                .map(|d| d.condition.to_lowercase())
                .unwrap_or_else(|| "unknown".to_string());
            format!("Conditions mainly {}.", condition)
        }
    }
}

/// WMO weather interpretation code description
pub fn weather_condition(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}
