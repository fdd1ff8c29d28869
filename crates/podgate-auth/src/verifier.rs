//! Signature-checked token validation
//!
//! Validates signature (via JWKS), issuer, audience and expiry, then hands
//! back the raw claim set.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ClaimsError, Result};
use crate::jwks::{JwksCache, OidcDiscovery};

/// Token verification settings
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected `iss`
    pub issuer_url: String,
    /// Accepted `aud` values
    pub audiences: Vec<String>,
}

/// Validates tokens issued by a single OIDC provider
pub struct TokenVerifier {
    config: VerifierConfig,
    keys: Arc<JwksCache>,
}

impl TokenVerifier {
    /// Create a verifier over an existing key cache
    pub fn new(config: VerifierConfig, keys: Arc<JwksCache>) -> Self {
        Self { config, keys }
    }

    /// Discover the provider's JWKS endpoint and build a verifier for it
    pub async fn discover(
        http: reqwest::Client,
        config: VerifierConfig,
        refresh_interval: Duration,
    ) -> Result<Self> {
        if config.issuer_url.is_empty() {
            return Err(ClaimsError::Config("issuer URL is required".into()));
        }
        if config.audiences.is_empty() {
            return Err(ClaimsError::Config("at least one audience is required".into()));
        }

        let discovery = OidcDiscovery::fetch(&http, &config.issuer_url).await?;
        let keys = JwksCache::new(http, discovery.jwks_uri, refresh_interval);

        Ok(Self::new(config, Arc::new(keys)))
    }

    /// Verification settings
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Validate `token` and return its claims
    pub async fn verify(&self, token: &str) -> Result<Map<String, Value>> {
        let header = decode_header(token).map_err(|e| ClaimsError::Parse(e.to_string()))?;

        debug!(kid = ?header.kid, alg = ?header.alg, "Decoded JWT header");

        let key = self.keys.key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.config.issuer_url]);
        validation.set_audience(&self.config.audiences);
        validation.validate_exp = true;

        let data = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| ClaimsError::Verification(e.to_string()))?;

        Ok(data.claims)
    }
}
