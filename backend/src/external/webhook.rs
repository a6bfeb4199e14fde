//! Registration webhook
//!
//! New accounts are forwarded (without password) to an external automation
//! endpoint before they are stored locally.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::UserProfile;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Payload POSTed for every signup
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistrationPayload {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
}

impl From<&UserProfile> for RegistrationPayload {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            location: profile.location.clone(),
        }
    }
}

#[async_trait]
pub trait RegistrationHook: Send + Sync {
    async fn notify(&self, payload: &RegistrationPayload) -> AppResult<()>;
}

/// Webhook client; an empty URL disables forwarding
#[derive(Clone)]
pub struct WebhookClient {
    http_client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: String) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            url: url.trim().to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }
}

#[async_trait]
impl RegistrationHook for WebhookClient {
    async fn notify(&self, payload: &RegistrationPayload) -> AppResult<()> {
        if !self.is_enabled() {
            tracing::debug!("Registration webhook not configured, skipping");
            return Ok(());
        }

        let response = self
            .http_client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::RegistrationService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "Registration webhook rejected signup");
            return Err(AppError::RegistrationService(format!(
                "Webhook returned {}",
                status
            )));
        }

        Ok(())
    }
}
