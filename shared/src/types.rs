//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Maximum number of crop photos considered for one analysis
pub const MAX_IMAGES: usize = 3;

/// Fallback coordinate used when a location string cannot be parsed (Los Angeles)
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    latitude: 34.05,
    longitude: -118.24,
};

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse a `"lat, lng"` string.
    ///
    /// Exactly two comma-separated parts are required and both must parse as
    /// floating point numbers. Surrounding whitespace is ignored.
    pub fn parse(location: &str) -> Option<Self> {
        let parts: Vec<&str> = location.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return None;
        }
        let latitude = parts[0].parse::<f64>().ok().filter(|v| v.is_finite())?;
        let longitude = parts[1].parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(Self::new(latitude, longitude))
    }

    /// Parse a location string, substituting [`DEFAULT_COORDINATES`] on failure
    pub fn parse_or_default(location: &str) -> Self {
        Self::parse(location).unwrap_or(DEFAULT_COORDINATES)
    }
}

/// An uploaded crop photo
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
            file_name: None,
        }
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Summary of an uploaded image, safe to return to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub mime_type: String,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl From<&ImagePayload> for ImageSummary {
    fn from(image: &ImagePayload) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            size_bytes: image.data.len(),
            file_name: image.file_name.clone(),
        }
    }
}
