//! OIDC provider endpoints and the authorization URL

use podgate_auth::OidcDiscovery;
use reqwest::Url;
use secrecy::SecretString;
use tracing::info;

use crate::error::{Error, Result};

/// Scopes requested on login
pub const SCOPES: &str = "openid offline_access";

/// Endpoints advertised by the provider's discovery document
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Issuer identifier
    pub issuer: String,
    /// Where the browser is sent to log in
    pub authorization_endpoint: String,
    /// Where codes are exchanged for tokens
    pub token_endpoint: String,
    /// Signing keys for ID tokens
    pub jwks_uri: String,
}

impl ProviderEndpoints {
    /// Discover the provider at `issuer_url`
    pub async fn discover(http: &reqwest::Client, issuer_url: &str) -> Result<Self> {
        let discovery = OidcDiscovery::fetch(http, issuer_url)
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;

        let endpoints = Self::try_from(discovery)?;
        info!(
            issuer = %endpoints.issuer,
            token_endpoint = %endpoints.token_endpoint,
            "Discovered OIDC provider"
        );
        Ok(endpoints)
    }
}

impl TryFrom<OidcDiscovery> for ProviderEndpoints {
    type Error = Error;

    fn try_from(discovery: OidcDiscovery) -> Result<Self> {
        let authorization_endpoint = discovery.authorization_endpoint.ok_or_else(|| {
            Error::Discovery("provider does not advertise an authorization_endpoint".into())
        })?;
        let token_endpoint = discovery.token_endpoint.ok_or_else(|| {
            Error::Discovery("provider does not advertise a token_endpoint".into())
        })?;

        Ok(Self {
            issuer: discovery.issuer,
            authorization_endpoint,
            token_endpoint,
            jwks_uri: discovery.jwks_uri,
        })
    }
}

/// Client registration with the provider
#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: SecretString,
    /// Callback URL
    pub redirect_uri: String,
    /// Fixed anti-forgery state value
    pub state: String,
}

/// Build the URL that starts the authorization-code flow
///
/// Always forces a fresh login with `prompt=login`.
pub fn authorization_url(endpoints: &ProviderEndpoints, settings: &LoginSettings) -> Result<Url> {
    Url::parse_with_params(
        &endpoints.authorization_endpoint,
        &[
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("state", settings.state.as_str()),
            ("prompt", "login"),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid authorization endpoint: {}", e)))
}
