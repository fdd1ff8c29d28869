//! Error types for claims extraction

/// Result type for claims operations
pub type Result<T> = std::result::Result<T, ClaimsError>;

/// Error type for claims extraction and token verification
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    /// Token structure could not be decoded
    #[error("failed to parse token: {0}")]
    Parse(String),

    /// The `sub` claim is absent, not a string, or empty
    #[error("sub claim missing or invalid")]
    MissingSubject,

    /// Signature, issuer, audience or expiry check failed
    #[error("token verification failed: {0}")]
    Verification(String),

    /// No JWKS key matches the token's key id
    #[error("no matching key found in JWKS for kid: {0}")]
    KeyNotFound(String),

    /// Provider discovery or key set retrieval failed
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// Invalid verifier configuration
    #[error("configuration error: {0}")]
    Config(String),
}
