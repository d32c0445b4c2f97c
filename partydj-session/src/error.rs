//! Error types for partydj-session
//!
//! Accounting and store errors surface synchronously to callers.
//! Regeneration errors are contained inside the regeneration pipeline and
//! only ever logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::llm::LlmError;

/// Main error type for partydj-session
#[derive(Debug, Error)]
pub enum Error {
    /// Cumulative token spend reached the session maximum
    #[error("Maximum token count has been reached ({spent} of {max})")]
    BudgetExceeded { spent: u64, max: u64 },

    /// Party/session code does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation not valid in the current session status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Fatal configuration problem (credentials, budget caps, truncation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream response failed validation
    #[error("Upstream validation failed: {0}")]
    Upstream(String),

    /// Language-model call failed
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Catalog/playback call failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// partydj-common error (database, IO, serialization)
    #[error(transparent)]
    Common(#[from] partydj_common::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Common(partydj_common::Error::Database(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Common(partydj_common::Error::Serialization(err))
    }
}

/// Convenience Result type using partydj-session Error
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::BudgetExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "BUDGET_EXCEEDED"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Error::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Error::Common(partydj_common::Error::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            Error::Common(partydj_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Upstream(_) | Error::Llm(_) | Error::Catalog(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            Error::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
