//! Error handling for the AgroX farm advisory service
//!
//! Provides consistent JSON error responses for every handler

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::FieldError;
use thiserror::Error;

/// Message shown when the primary crop analysis fails
pub const ANALYSIS_FAILED_MESSAGE: &str = "An error occurred during analysis. Please try again.";

/// Message shown when analyze is requested without images or environment data
pub const ANALYSIS_PRECONDITION_MESSAGE: &str =
    "Please select at least one file and ensure all data is loaded.";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Form validation failed")]
    FormValidation(Vec<FieldError>),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    // Workflow errors
    #[error("Operation already in progress: {0}")]
    Busy(String),

    #[error("Superseded by a newer request: {0}")]
    Superseded(String),

    // External service errors
    #[error("Crop analysis failed: {0}")]
    AnalysisFailed(#[source] InferenceError),

    #[error("Registration service error: {0}")]
    RegistrationService(String),

    #[error("Callback request failed: {0}")]
    CallbackFailed(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Failures talking to the generative model
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        InferenceError::Request(e.to_string())
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(e: serde_json::Error) -> Self {
        InferenceError::MalformedResponse(e.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            errors: Vec::new(),
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    /// HTTP status and response body for this error
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password."),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::FormValidation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    errors: errors.clone(),
                    ..ErrorDetail::new(
                        "VALIDATION_ERROR",
                        errors
                            .first()
                            .map(|e| e.message.clone())
                            .unwrap_or_else(|| "Invalid form".to_string()),
                    )
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("An account with this {} already exists.", field),
                )
                .with_field(field),
            ),
            AppError::Busy(operation) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "OPERATION_IN_PROGRESS",
                    format!("{} is already in progress", operation),
                ),
            ),
            AppError::Superseded(operation) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "SUPERSEDED",
                    format!("{} was superseded by a newer selection", operation),
                ),
            ),
            AppError::AnalysisFailed(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("ANALYSIS_FAILED", ANALYSIS_FAILED_MESSAGE),
            ),
            AppError::RegistrationService(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "REGISTRATION_SERVICE_ERROR",
                    "Could not connect to the registration service.",
                ),
            ),
            AppError::CallbackFailed(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "CALLBACK_FAILED",
                    "Failed to request callback. Please try again.",
                ),
            ),
            AppError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("EXTERNAL_SERVICE_ERROR", format!("External service error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
