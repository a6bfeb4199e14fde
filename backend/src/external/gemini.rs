//! Gemini generateContent client
//!
//! Thin REST wrapper: request/response wire types plus one call. Prompting
//! and result normalisation live in the inference and chat services.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{Coordinates, GroundingSource, ImagePayload};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::InferenceError;

/// Client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single user turn made of the given parts
    pub fn user_turn(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            ..Default::default()
        }
    }

    /// Ask for a JSON answer matching `schema`
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts,
        }
    }

    /// Role-less content, used for the system instruction
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Base64-encode an uploaded image as inline data
    pub fn image(image: &ImagePayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Grounding tools; serialized as `{"googleSearch": {}}` / `{"googleMaps": {}}`
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    GoogleSearch {},
    GoogleMaps {},
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub retrieval_config: RetrievalConfig,
}

impl ToolConfig {
    pub fn located_at(coords: Coordinates) -> Self {
        Self {
            retrieval_config: RetrievalConfig { lat_lng: coords },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub lat_lng: Coordinates,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
    pub maps: Option<MapsChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub place_answer_sources: Option<PlaceAnswerSources>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceAnswerSources {
    #[serde(default)]
    pub review_snippets: Vec<ReviewSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSnippet {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or_default()
    }

    /// Web search citations, in response order (not deduplicated)
    pub fn web_sources(&self) -> Vec<GroundingSource> {
        self.grounding_chunks()
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.clone()?;
                let title = non_empty(web.title.as_deref()).unwrap_or("Web Search Result");
                Some(GroundingSource::new(uri, title))
            })
            .collect()
    }

    /// Maps place and review citations, in response order (not deduplicated)
    pub fn maps_sources(&self) -> Vec<GroundingSource> {
        let mut sources = Vec::new();

        for maps in self.grounding_chunks().iter().filter_map(|c| c.maps.as_ref()) {
            if let Some(uri) = non_empty(maps.uri.as_deref()) {
                let title = non_empty(maps.title.as_deref()).unwrap_or("Google Maps Result");
                sources.push(GroundingSource::new(uri, title));
            }

            let snippets = maps
                .place_answer_sources
                .as_ref()
                .map(|p| p.review_snippets.as_slice())
                .unwrap_or_default();

            for snippet in snippets {
                if let Some(uri) = non_empty(snippet.uri.as_deref()) {
                    let title = match non_empty(snippet.title.as_deref()) {
                        Some(title) => title.to_string(),
                        None => review_title(snippet.text.as_deref().unwrap_or_default()),
                    };
                    sources.push(GroundingSource::new(uri, title));
                }
            }
        }

        sources
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// "Review: " plus the first 30 characters of the snippet
fn review_title(text: &str) -> String {
    let excerpt: String = text.chars().take(30).collect();
    format!("Review: {}...", excerpt)
}

// ============================================================================
// Client
// ============================================================================

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Create a client against a custom endpoint (for testing)
    pub fn with_base_url(base_url: String, model: &str) -> Self {
        Self::new(&GeminiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: model.to_string(),
            timeout_secs: 10,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST `models/{model}:generateContent`
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, InferenceError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferenceError::Status { status, body });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
