//! Chat transcript models

use serde::{Deserialize, Serialize};

use super::market::GroundingSource;

/// Greeting seeded into every new transcript
pub const CHAT_GREETING: &str =
    "Analysis complete! Ask me anything about the crop image or your local area.";

/// Reply appended when the assistant cannot answer
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<GroundingSource>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: None,
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
            sources: None,
        }
    }

    pub fn model_with_sources(content: impl Into<String>, sources: Vec<GroundingSource>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
            sources: Some(sources),
        }
    }
}

/// Text and citations returned for one chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// True when no user-authored message is present yet
pub fn is_first_user_turn(transcript: &[ChatMessage]) -> bool {
    !transcript.iter().any(|m| m.role == ChatRole::User)
}
