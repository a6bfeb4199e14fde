//! Vapi voice-AI callback client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::VapiConfig;
use crate::error::{AppError, AppResult};

/// Places an outbound phone call to a farmer
#[async_trait]
pub trait CallbackService: Send + Sync {
    async fn request_callback(&self, phone_number: &str) -> AppResult<()>;
}

/// Client for the Vapi phone-call API
#[derive(Clone)]
pub struct VapiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
    phone_number_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallRequest<'a> {
    assistant_id: &'a str,
    phone_number_id: &'a str,
    customer: Customer<'a>,
}

#[derive(Debug, Serialize)]
struct Customer<'a> {
    number: &'a str,
}

impl VapiClient {
    pub fn new(config: &VapiConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            assistant_id: config.assistant_id.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }
}

#[async_trait]
impl CallbackService for VapiClient {
    async fn request_callback(&self, phone_number: &str) -> AppResult<()> {
        let url = format!("{}/call/phone", self.base_url);
        let payload = CallRequest {
            assistant_id: &self.assistant_id,
            phone_number_id: &self.phone_number_id,
            customer: Customer {
                number: phone_number,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::CallbackFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            tracing::error!(status = %status, body = %body, "Vapi API error");
            return Err(AppError::CallbackFailed(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        tracing::info!("Callback requested successfully");
        Ok(())
    }
}
