//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`RegistryError`] to HTTP status codes and JSON error bodies.
//! Internal error details (storage, hashing) are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use licd_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "FORBIDDEN").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context. For rejected verifications this carries the
    /// `reason` (`bad_credentials`, `suspended`, `machine_mismatch`, `expired`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body or field could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A license verification was refused (401).
    #[error("{message}")]
    LicenseRejected {
        reason: &'static str,
        message: String,
    },

    /// Admin token missing or wrong (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Server is missing required configuration (500). The message is
    /// returned so operators can see what to fix.
    #[error("server misconfigured: {0}")]
    Misconfigured(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::LicenseRejected { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Misconfigured(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MISCONFIGURED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Misconfigured(_) => tracing::error!(error = %self, "refusing admin request"),
            _ => {}
        }

        let details = match &self {
            Self::LicenseRejected { reason, .. } => Some(serde_json::json!({ "reason": reason })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::NotFound(_) => Self::NotFound(message),
            RegistryError::BadCredentials => Self::LicenseRejected {
                reason: "bad_credentials",
                message,
            },
            RegistryError::Suspended => Self::LicenseRejected {
                reason: "suspended",
                message,
            },
            RegistryError::MachineMismatch => Self::LicenseRejected {
                reason: "machine_mismatch",
                message,
            },
            RegistryError::Expired(_) => Self::LicenseRejected {
                reason: "expired",
                message,
            },
            RegistryError::Unauthorized => Self::Forbidden(message),
            RegistryError::Conflict(_) => Self::Conflict(message),
            RegistryError::InvalidInput(_) => Self::BadRequest(message),
            RegistryError::Misconfigured => Self::Misconfigured(message),
            RegistryError::Hashing(_) | RegistryError::Storage(_) => Self::Internal(message),
        }
    }
}
