/// Unified error types for Content Studio
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum StudioError {
    /// Missing or malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Task form rejected; one message per offending field
    #[error("Task validation failed")]
    TaskValidation(BTreeMap<String, String>),

    /// Upstream AI provider rejected our credential
    #[error("{0}")]
    UpstreamAuth(String),

    /// Any other upstream AI provider failure
    #[error("{0}")]
    Upstream(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// State machine violations (e.g. cancelling a published task)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload larger than the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload with a MIME type we do not accept
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl StudioError {
    /// HTTP status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            StudioError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            StudioError::TaskValidation(_) => (StatusCode::BAD_REQUEST, "InvalidTask"),
            StudioError::UpstreamAuth(_) => (StatusCode::UNAUTHORIZED, "UpstreamCredentialInvalid"),
            StudioError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UpstreamError"),
            StudioError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            StudioError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            StudioError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            StudioError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedMediaType")
            }
            StudioError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded")
            }
            StudioError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

/// Convert StudioError to HTTP response
impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            // Don't leak details
            StudioError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let fields = match self {
            StudioError::TaskValidation(fields) => Some(fields),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for StudioError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        StudioError::Validation(messages.join("; "))
    }
}

/// Result type alias for service operations
pub type StudioResult<T> = Result<T, StudioError>;
