//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use call_keeper_core::webhook::{SignatureError, WebhookError};
use call_keeper_core::StorageError;
use tracing::{error, warn};

/// Build the `{ok:false,error}` body every error response carries
fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "error": message,
    })
}

// ============================================================================
// Webhook handler errors
// ============================================================================

/// Webhook handler errors with HTTP status code mapping.
///
/// The ingestion contract distinguishes three failure classes:
///
/// - `401 Unauthorized`: any signature failure (missing, malformed, stale,
///   or mismatched). The specific failure is carried in the error message so
///   the modes stay distinguishable in logs and responses.
/// - `400 Bad Request`: the body was not valid JSON, was not an object, or a
///   required normalized field was unusable. Permanent; the provider should
///   not redeliver.
/// - `500 Internal Server Error`: the document store failed. Safe for the
///   provider to redeliver because the idempotency check re-runs on retry.
#[derive(Debug, thiserror::Error)]
pub enum IngestHandlerError {
    /// Request authenticity could not be established
    #[error("Unauthorized: {0}")]
    Unauthorized(SignatureError),

    /// The payload failed parsing or normalization
    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    /// The document store failed mid-ingestion
    #[error("Storage failure: {message}")]
    StorageFailure { message: String },
}

impl From<WebhookError> for IngestHandlerError {
    fn from(error: WebhookError) -> Self {
        match error {
            WebhookError::Signature(e) => Self::Unauthorized(e),
            WebhookError::JsonParsing(e) => Self::InvalidPayload {
                message: e.to_string(),
            },
            WebhookError::Normalization(e) => Self::InvalidPayload {
                message: e.to_string(),
            },
            WebhookError::Reconcile(e) => Self::StorageFailure {
                message: e.to_string(),
            },
        }
    }
}

impl IngestHandlerError {
    /// The HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Self::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Unauthorized(e) => {
                warn!(reason = %e, "Rejected webhook delivery: signature failure")
            }
            Self::InvalidPayload { message } => {
                warn!(reason = %message, "Rejected webhook delivery: invalid payload")
            }
            Self::StorageFailure { message } => {
                error!(reason = %message, "Webhook delivery failed on storage")
            }
        }

        (status, Json(error_body(&self.to_string()))).into_response()
    }
}

// ============================================================================
// REST API errors
// ============================================================================

/// Errors for the lead/call REST surface
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {resource} '{id}'")]
    NotFound { resource: String, id: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Convenience constructor for unparseable path/query identifiers
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Storage(e) => {
                error!(error = %e, "Storage failure serving API request");
                if e.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        };

        (status, Json(error_body(&self.to_string()))).into_response()
    }
}

// ============================================================================
// Service errors
// ============================================================================

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
