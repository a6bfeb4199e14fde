//! Market trend models and response text parsing

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Direction of local market prices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum MarketTrend {
    Rising,
    #[default]
    Stable,
    Falling,
}

impl MarketTrend {
    /// Parse the exact wire spelling used in model responses
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Rising" => Some(MarketTrend::Rising),
            "Stable" => Some(MarketTrend::Stable),
            "Falling" => Some(MarketTrend::Falling),
            _ => None,
        }
    }

    /// Keyword scan over free text: "rising" wins over "falling"
    pub fn scan(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("rising") {
            MarketTrend::Rising
        } else if lower.contains("falling") {
            MarketTrend::Falling
        } else {
            MarketTrend::Stable
        }
    }
}

impl fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTrend::Rising => write!(f, "Rising"),
            MarketTrend::Stable => write!(f, "Stable"),
            MarketTrend::Falling => write!(f, "Falling"),
        }
    }
}

/// A citation accompanying a generated answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

impl GroundingSource {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }
}

/// Keep the first occurrence of each URI, preserving order
pub fn dedup_sources(sources: Vec<GroundingSource>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

/// Market trend snapshot for a region and optionally a crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub trend: MarketTrend,
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}

impl MarketSnapshot {
    /// Snapshot used when the market lookup fails
    pub fn fallback() -> Self {
        Self {
            trend: MarketTrend::Stable,
            summary: "Could not fetch live market data. General stability expected.".to_string(),
            sources: Vec::new(),
        }
    }

    /// Interpret a free-text model response.
    ///
    /// A fenced ```json block carrying `trend` and `summary` is preferred.
    /// When the block is missing or does not parse, the trend comes from a
    /// keyword scan and the summary is the raw text.
    pub fn from_response_text(text: &str, sources: Vec<GroundingSource>) -> Self {
        let parsed = extract_fenced_json(text)
            .and_then(|block| serde_json::from_str::<serde_json::Value>(block).ok())
            .filter(serde_json::Value::is_object);

        let (trend, summary) = match parsed {
            Some(value) => {
                let trend = value
                    .get("trend")
                    .and_then(|t| t.as_str())
                    .and_then(MarketTrend::from_label)
                    .unwrap_or_default();
                let summary = value
                    .get("summary")
                    .and_then(|s| s.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(text)
                    .to_string();
                (trend, summary)
            }
            None => (MarketTrend::scan(text), text.to_string()),
        };

        Self {
            trend,
            summary,
            sources: dedup_sources(sources),
        }
    }
}

/// Body of the first ```json fenced block, if any
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    const OPEN: &str = "```json\n";
    let start = text.find(OPEN)? + OPEN.len();
    let rest = &text[start..];
    let end = rest.find("\n```")?;
    Some(&rest[..end])
}
