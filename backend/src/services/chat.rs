//! Conversational assistant sessions
//!
//! A session is bound to one location and keeps its own turn history.
//! Grounding uses the Google Maps tool so answers can cite local places.

use async_trait::async_trait;
use shared::{dedup_sources, ChatReply, Coordinates, ImagePayload};
use std::sync::{Arc, Mutex};

use crate::error::InferenceError;
use crate::external::gemini::{
    Content, GenerateContentRequest, GeminiClient, Part, Tool, ToolConfig,
};

#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send one user turn. Images are attached only when given.
    async fn send_message(
        &self,
        text: &str,
        images: Option<&[ImagePayload]>,
    ) -> Result<ChatReply, InferenceError>;
}

pub trait ChatSessionFactory: Send + Sync {
    fn create_session(&self, location: &str) -> Arc<dyn ChatSession>;
}

/// System directive for a farmer at `location`
pub fn system_directive(location: &str) -> String {
    format!(
        "You are AgroX, a helpful assistant for farmers located at {}. Your role is to answer questions about the crop image the user provides in a concise and helpful way. You MUST keep their location in mind for any recommendations. Use your tools to find local suppliers, market data, or other geographically relevant information when asked.",
        location
    )
}

/// Creates Gemini-backed chat sessions
#[derive(Clone)]
pub struct GeminiChatFactory {
    client: GeminiClient,
}

impl GeminiChatFactory {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

impl ChatSessionFactory for GeminiChatFactory {
    fn create_session(&self, location: &str) -> Arc<dyn ChatSession> {
        Arc::new(GeminiChatSession::new(self.client.clone(), location))
    }
}

pub struct GeminiChatSession {
    client: GeminiClient,
    directive: String,
    coords: Option<Coordinates>,
    history: Mutex<Vec<Content>>,
}

impl GeminiChatSession {
    pub fn new(client: GeminiClient, location: &str) -> Self {
        Self {
            client,
            directive: system_directive(location),
            coords: Coordinates::parse(location),
            history: Mutex::new(Vec::new()),
        }
    }

    fn history_snapshot(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn build_request(&self, turn: Content) -> GenerateContentRequest {
        let mut contents = self.history_snapshot();
        contents.push(turn);

        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::instruction(self.directive.clone())),
            tools: vec![Tool::GoogleMaps {}],
            tool_config: self.coords.map(ToolConfig::located_at),
            generation_config: None,
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_message(
        &self,
        text: &str,
        images: Option<&[ImagePayload]>,
    ) -> Result<ChatReply, InferenceError> {
        let mut parts: Vec<Part> = images
            .unwrap_or_default()
            .iter()
            .map(Part::image)
            .collect();
        parts.push(Part::text(text));
        let turn = Content::user(parts);

        let request = self.build_request(turn.clone());
        let response = self.client.generate_content(&request).await?;
        let reply_text = response.text().ok_or(InferenceError::EmptyResponse)?;
        let sources = dedup_sources(response.maps_sources());

        {
            let mut history = self
                .history
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            history.push(turn);
            history.push(Content::model(vec![Part::text(reply_text.clone())]));
        }

        tracing::debug!(sources = sources.len(), "Chat reply received");

        Ok(ChatReply {
            text: reply_text,
            sources,
        })
    }
}
