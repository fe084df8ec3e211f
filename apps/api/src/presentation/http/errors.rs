//! HTTP error handling and response conversion.
//!
//! Domain failures are mapped to status codes here. Client mistakes (unknown
//! keys, identity collisions, malformed input) become 4xx responses; every
//! partial multi-store failure and adapter fault becomes a 5xx and is logged
//! with its full context so an operator can reconcile by hand.

use crate::domain::picture::errors::DomainError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Application-level errors returned from handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found (404).
    NotFound(String),

    /// Malformed request (400).
    BadRequest(String),

    /// Identity collision (409).
    Conflict(String),

    /// Request data failed validation (400).
    ValidationError(String),

    /// A multi-store operation stopped half way (500).
    PartialFailure(String),

    /// Database operation failed (500).
    Database(String),

    /// Storage/file operation failed (500).
    Storage(String),

    /// Unclassified internal error (500).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::PartialFailure(msg) => write!(f, "Partial failure: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PartialFailure(_) | Self::Database(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-safe error message.
    ///
    /// Client errors echo their detail. Partial failures keep theirs too,
    /// since the caller needs the stage and key to reconcile.
    fn user_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ValidationError(msg)
            | Self::PartialFailure(msg) => msg.clone(),
            Self::Database(_) => "Database operation failed".into(),
            Self::Storage(_) => "File operation failed".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.user_message();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("error={}", self);
            }
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                tracing::warn!("error={}", self);
            }
            _ => {
                tracing::info!("error={}", self);
            }
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// === Domain Error Conversion ===

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. }
            | DomainError::TagNotFound { .. }
            | DomainError::BlobNotFound { .. } => AppError::NotFound(err.to_string()),
            DomainError::AlreadyExists { .. } => AppError::Conflict(err.to_string()),
            DomainError::UnknownStage(_)
            | DomainError::InvalidTransition { .. }
            | DomainError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            DomainError::PartialTransferFailure { .. } | DomainError::OrphanBlob { .. } => {
                tracing::error!(reconciliation_required = %err);
                AppError::PartialFailure(err.to_string())
            }
            DomainError::UncroppableRegion { .. }
            | DomainError::UnsupportedContainer(_)
            | DomainError::Codec(_) => AppError::Internal(err.to_string()),
            DomainError::Storage(msg) => AppError::Storage(msg),
            DomainError::InfrastructureError(msg) => {
                tracing::error!(infrastructure_error = %msg);
                AppError::Database(msg)
            }
        }
    }
}

// === Request Body Conversion ===

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        tracing::warn!(multipart_error = %err);
        AppError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

// === General Fallback Error Conversion ===

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(anyhow_error = %err, "Unclassified error with chain");
        err.chain().for_each(|cause| {
            tracing::error!(cause = %cause, "Error source");
        });
        AppError::Internal("Operation failed".into())
    }
}
