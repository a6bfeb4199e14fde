//! Dashboard handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use shared::ImagePayload;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::{Dashboard, DashboardView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// The user's dashboard, created on first use
async fn dashboard_for(state: &AppState, current_user: CurrentUser) -> AppResult<Arc<Dashboard>> {
    let user_id = current_user.0.user_id;
    if let Some(dashboard) = state.dashboards.get(user_id).await {
        return Ok(dashboard);
    }

    let profile = state.accounts.profile(user_id).await?;
    Ok(state.dashboards.open(&profile).await)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    Ok(Json(dashboard.view().await))
}

/// Re-fetch soil, weather and generic market data
pub async fn refresh_environment(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.load_environment().await;
    Ok(Json(dashboard.view().await))
}

/// Replace the image set from a multipart upload
pub async fn upload_images(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;

    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?
    {
        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !mime_type.starts_with("image/") {
            return Err(AppError::Validation {
                field: field.name().unwrap_or("file").to_string(),
                message: "Only image files can be uploaded.".to_string(),
            });
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?;

        images.push(ImagePayload {
            mime_type,
            data: data.to_vec(),
            file_name,
        });
    }

    tracing::debug!(user_id = %dashboard.user().id, count = images.len(), "Images selected");

    dashboard.select_images(images).await;
    Ok(Json(dashboard.view().await))
}

pub async fn clear_images(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.clear_images().await;
    Ok(Json(dashboard.view().await))
}

/// Analyze the selected images, then refine the harvest suggestion in the background
pub async fn analyze(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.analyze().await?;

    let refiner = dashboard.clone();
    tokio::spawn(async move {
        refiner.refine_if_needed().await;
    });

    Ok(Json(dashboard.view().await))
}

/// Run the refinement step now if it is still pending
pub async fn refine(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.refine_if_needed().await;
    Ok(Json(dashboard.view().await))
}

pub async fn send_chat_message(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.send_chat_message(&body.message).await?;
    Ok(Json(dashboard.view().await))
}

pub async fn request_callback(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardView>> {
    let dashboard = dashboard_for(&state, current_user).await?;
    dashboard.request_callback().await?;
    Ok(Json(dashboard.view().await))
}
