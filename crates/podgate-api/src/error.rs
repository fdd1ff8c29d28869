//! Error types for the Pod API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type for Pod API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Pod API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad Authorization header or undecodable token
    #[error("{0}")]
    Unauthorized(String),

    /// Impersonated client could not be built from the base config
    #[error("Failed to create impersonation client: {0}")]
    ClientConstruction(String),

    /// Kubernetes rejected the Pod create
    #[error("Failed to create pod: {0}")]
    CreateFailed(String),

    /// Kubernetes rejected the Pod list
    #[error("Failed to list pods: {0}")]
    ListFailed(String),

    /// Pod lookup failed; not-found and other lookup errors are not told apart
    #[error("Pod {name} not found: {message}")]
    PodNotFound {
        /// Requested Pod name
        name: String,
        /// Underlying lookup error
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::PodNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ClientConstruction(_)
            | Error::CreateFailed(_)
            | Error::ListFailed(_)
            | Error::Config(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });

        (status, axum::Json(body)).into_response()
    }
}
