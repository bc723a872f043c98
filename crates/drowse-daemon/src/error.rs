//! Error types for the daemon and its HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Fatal daemon errors (startup and server lifecycle).
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Invalid or missing required settings. The process does not start.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server lifecycle error.
    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for daemon lifecycle operations.
pub type DaemonResult<T> = std::result::Result<T, DaemonError>;

/// Errors surfaced to HTTP callers.
///
/// Rendered as the stable body
/// `{"error":{"type":...,"message":...,"details":{...}}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing shared-secret header.
    #[error("Invalid or missing API key")]
    Unauthorized,

    /// Route or resource does not exist for this role.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required configuration missing at request time.
    #[error("Missing configuration: {0}")]
    Configuration(String),

    /// An external suspend/WoL invocation failed.
    #[error("{message}")]
    SystemCommand {
        message: String,
        command: String,
        return_code: Option<i32>,
        stderr: String,
    },

    /// Peer unreachable or timed out within the bounded request window.
    #[error("Request to peer timed out")]
    PeerTimeout,

    /// Peer reachable but the exchange failed.
    #[error("{message}")]
    Network { message: String, details: Value },

    /// Anything unexpected. The body carries no internal detail; the full
    /// error is logged server-side.
    #[error("An unexpected error occurred")]
    Internal(#[source] anyhow::Error),
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Stable wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SystemCommand { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PeerTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Network { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Configuration(_) => "ConfigurationError",
            ApiError::SystemCommand { .. } => "SystemCommandError",
            ApiError::PeerTimeout | ApiError::Network { .. } => "NetworkError",
            ApiError::Internal(_) => "UnexpectedError",
        }
    }

    fn details(&self) -> Value {
        match self {
            ApiError::SystemCommand {
                command,
                return_code,
                stderr,
                ..
            } => json!({
                "command": command,
                "return_code": return_code,
                "stderr": stderr,
            }),
            ApiError::Network { details, .. } => details.clone(),
            _ => json!({}),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(source) => {
                tracing::error!(error = ?source, "Unexpected error");
            }
            other => {
                tracing::error!(kind = other.kind(), error = %other, "Request failed");
            }
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}
