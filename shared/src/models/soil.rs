//! Soil condition models

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Coordinates;

/// Soil health classification derived from surface moisture
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SoilHealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SoilHealthStatus {
    /// Classify a moisture percentage.
    ///
    /// `> 70` Excellent, `> 40` Good, `< 20` Poor, anything else Fair.
    pub fn from_moisture(moisture: i32) -> Self {
        if moisture > 70 {
            SoilHealthStatus::Excellent
        } else if moisture > 40 {
            SoilHealthStatus::Good
        } else if moisture < 20 {
            SoilHealthStatus::Poor
        } else {
            SoilHealthStatus::Fair
        }
    }

    pub fn fertility(&self) -> Fertility {
        match self {
            SoilHealthStatus::Excellent => Fertility::High,
            SoilHealthStatus::Good | SoilHealthStatus::Fair => Fertility::Medium,
            SoilHealthStatus::Poor => Fertility::Low,
        }
    }
}

impl fmt::Display for SoilHealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoilHealthStatus::Excellent => write!(f, "Excellent"),
            SoilHealthStatus::Good => write!(f, "Good"),
            SoilHealthStatus::Fair => write!(f, "Fair"),
            SoilHealthStatus::Poor => write!(f, "Poor"),
        }
    }
}

/// Soil fertility band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Fertility {
    High,
    Medium,
    Low,
}

impl fmt::Display for Fertility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fertility::High => write!(f, "High"),
            Fertility::Medium => write!(f, "Medium"),
            Fertility::Low => write!(f, "Low"),
        }
    }
}

/// Macro nutrient index values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nutrients {
    pub nitrogen: i32,
    pub phosphorus: i32,
    pub potassium: i32,
}

/// Soil snapshot for a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoilSnapshot {
    /// Surface moisture as a percentage (0-100)
    pub moisture: i32,
    pub health_status: SoilHealthStatus,
    pub nutrients: Nutrients,
    pub ph: f64,
    pub fertility: Fertility,
}

impl SoilSnapshot {
    /// Build a snapshot from the provider's volumetric moisture (m³/m³)
    /// and the coordinate it was measured at.
    pub fn from_reading(volumetric_moisture: f64, coords: Coordinates) -> Self {
        let moisture = (round_half_up(volumetric_moisture * 100.0) as i32).clamp(0, 100);
        let health_status = SoilHealthStatus::from_moisture(moisture);

        Self {
            moisture,
            health_status,
            nutrients: nutrients_for(coords),
            ph: ph_for(coords),
            fertility: health_status.fertility(),
        }
    }

    /// Snapshot used when the provider cannot be reached
    pub fn fallback() -> Self {
        Self {
            moisture: 45,
            health_status: SoilHealthStatus::Good,
            nutrients: Nutrients {
                nitrogen: 78,
                phosphorus: 65,
                potassium: 82,
            },
            ph: 6.8,
            fertility: Fertility::Medium,
        }
    }
}

/// Nutrient indices derived from the coordinate
pub fn nutrients_for(coords: Coordinates) -> Nutrients {
    let sum = coords.latitude + coords.longitude;
    Nutrients {
        nitrogen: 75 + round_half_up(sum % 10.0) as i32,
        phosphorus: 60 + round_half_up(sum % 8.0) as i32,
        potassium: 80 + round_half_up(sum % 12.0) as i32,
    }
}

/// pH derived from the coordinate, rounded to one decimal place
pub fn ph_for(coords: Coordinates) -> f64 {
    let raw = 6.5 + (coords.latitude % 1.0) - 0.5;
    (raw * 10.0).round() / 10.0
}

/// Round to the nearest integer with ties going towards positive infinity
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
