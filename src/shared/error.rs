//! Application Error Types
//!
//! Centralized error handling with Axum integration, plus the error taxonomy
//! of the signaling core.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type (HTTP surface and infrastructure)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse {
            code,
            message,
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Errors raised while handling a realtime connection.
///
/// None of these ever crosses into another connection's processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// Missing or rejected credential; the connection never becomes active.
    #[error("Authentication error: {0}")]
    AuthRejected(String),

    /// A required field is missing or the frame cannot be parsed.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// No live peer for the requested target.
    #[error("Target unavailable: {0}")]
    TargetUnavailable(String),

    /// Unexpected fault while relaying.
    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl From<SignalError> for AppError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::AuthRejected(msg) => AppError::Unauthorized(msg),
            SignalError::MalformedEvent(msg) => AppError::Validation(msg),
            SignalError::TargetUnavailable(msg) | SignalError::InternalFailure(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}
