//! Authorization code exchange and ID token verification

use std::sync::Arc;

use async_trait::async_trait;
use podgate_auth::jwks::DEFAULT_REFRESH_INTERVAL;
use podgate_auth::{JwksCache, TokenVerifier, VerifierConfig};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::provider::{LoginSettings, ProviderEndpoints};

/// Token endpoint response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type, normally `Bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Refresh token (granted for `offline_access`)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Raw ID token
    #[serde(default)]
    pub id_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Talks to the provider on behalf of the callback handler
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Redeem an authorization code
    async fn exchange(&self, code: &str) -> Result<TokenResponse>;

    /// Verify an ID token and return its claims
    async fn verify_id_token(&self, id_token: &str) -> Result<Map<String, Value>>;
}

/// Verifier for the provider's ID tokens: issuer must match and the
/// audience must be this client
pub fn id_token_verifier(
    http: reqwest::Client,
    endpoints: &ProviderEndpoints,
    client_id: &str,
) -> TokenVerifier {
    let keys = JwksCache::new(http, endpoints.jwks_uri.clone(), DEFAULT_REFRESH_INTERVAL);
    TokenVerifier::new(
        VerifierConfig {
            issuer_url: endpoints.issuer.clone(),
            audiences: vec![client_id.to_string()],
        },
        Arc::new(keys),
    )
}

/// [`TokenExchange`] against a live OIDC provider
pub struct OidcTokenExchange {
    http: reqwest::Client,
    token_endpoint: String,
    settings: LoginSettings,
    verifier: TokenVerifier,
}

impl OidcTokenExchange {
    /// Create an exchange for `token_endpoint` using `verifier` for ID tokens
    pub fn new(
        http: reqwest::Client,
        token_endpoint: String,
        settings: LoginSettings,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            http,
            token_endpoint,
            settings,
            verifier,
        }
    }

    /// Create an exchange from discovered provider endpoints
    pub fn from_endpoints(
        http: reqwest::Client,
        endpoints: &ProviderEndpoints,
        settings: LoginSettings,
    ) -> Self {
        let verifier = id_token_verifier(http.clone(), endpoints, &settings.client_id);
        Self::new(http, endpoints.token_endpoint.clone(), settings, verifier)
    }
}

#[async_trait]
impl TokenExchange for OidcTokenExchange {
    async fn exchange(&self, code: &str) -> Result<TokenResponse> {
        debug!(endpoint = %self.token_endpoint, "Exchanging authorization code");

        let response = self
            .http
            .post(&self.token_endpoint)
            .basic_auth(
                &self.settings.client_id,
                Some(self.settings.client_secret.expose_secret()),
            )
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Token endpoint rejected code");
            return Err(Error::Exchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::Exchange(format!("invalid token response: {}", e)))
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<Map<String, Value>> {
        self.verifier
            .verify(id_token)
            .await
            .map_err(Error::Verification)
    }
}
