//! Error types for the login flow

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use podgate_auth::ClaimsError;

/// Result type for login operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for login operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Callback `state` differs from the one the login URL carried
    #[error("Invalid state")]
    StateMismatch,

    /// Token endpoint rejected the code or was unreachable
    #[error("Failed to exchange token: {0}")]
    Exchange(String),

    /// Token response carried no `id_token`
    #[error("No ID token found")]
    MissingIdToken,

    /// ID token failed signature, issuer, audience or expiry checks
    #[error("Failed to verify ID token: {0}")]
    Verification(#[source] ClaimsError),

    /// Provider discovery failed
    #[error("Failed to get OIDC provider: {0}")]
    Discovery(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::StateMismatch => StatusCode::BAD_REQUEST,
            Error::Exchange(_)
            | Error::MissingIdToken
            | Error::Verification(_)
            | Error::Discovery(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
