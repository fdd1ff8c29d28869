//! OIDC discovery and JWKS key cache
//!
//! Keys are fetched from the issuer's `jwks_uri` on first use and refreshed
//! once the cached set is older than the configured interval.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ClaimsError, Result};

/// Default JWKS refresh interval
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Minimum age of the key set before an unknown `kid` may force a refetch
pub const DEFAULT_REKEY_COOLDOWN: Duration = Duration::from_secs(10);

/// OIDC discovery document (subset)
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    /// Issuer identifier
    pub issuer: String,
    /// URL of the provider's JSON Web Key Set
    pub jwks_uri: String,
    /// Authorization endpoint for the code flow
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    /// Token endpoint for code exchange
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

impl OidcDiscovery {
    /// Fetch `<issuer>/.well-known/openid-configuration`
    ///
    /// The advertised issuer must match `issuer_url` exactly.
    pub async fn fetch(http: &reqwest::Client, issuer_url: &str) -> Result<Self> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            issuer_url.trim_end_matches('/')
        );

        debug!(url = %discovery_url, "Fetching OIDC discovery document");

        let discovery: OidcDiscovery = http
            .get(&discovery_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ClaimsError::Discovery(format!("failed to fetch {}: {}", discovery_url, e)))?
            .json()
            .await
            .map_err(|e| ClaimsError::Discovery(format!("invalid discovery response: {}", e)))?;

        if discovery.issuer != issuer_url {
            return Err(ClaimsError::Config(format!(
                "issuer mismatch: expected {}, got {}",
                issuer_url, discovery.issuer
            )));
        }

        Ok(discovery)
    }
}

/// JWKS document
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkKey>,
}

/// Individual JWK key
#[derive(Debug, Deserialize)]
struct JwkKey {
    kty: String,
    kid: Option<String>,
    n: Option<String>,
    e: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Cache of decoding keys indexed by key id
pub struct JwksCache {
    source: Option<KeySource>,
    cache: RwLock<Option<CachedKeys>>,
}

struct KeySource {
    http: reqwest::Client,
    jwks_uri: String,
    refresh_interval: Duration,
    rekey_cooldown: Duration,
}

impl JwksCache {
    /// Create a cache that fetches keys from `jwks_uri`
    pub fn new(http: reqwest::Client, jwks_uri: String, refresh_interval: Duration) -> Self {
        Self {
            source: Some(KeySource {
                http,
                jwks_uri,
                refresh_interval,
                rekey_cooldown: DEFAULT_REKEY_COOLDOWN,
            }),
            cache: RwLock::new(None),
        }
    }

    /// Create a cache pinned to a fixed key set that never refreshes
    pub fn from_keys(keys: HashMap<String, DecodingKey>) -> Self {
        Self {
            source: None,
            cache: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
        }
    }

    /// Override how soon an unknown `kid` may trigger another fetch
    pub fn with_rekey_cooldown(mut self, cooldown: Duration) -> Self {
        if let Some(source) = &mut self.source {
            source.rekey_cooldown = cooldown;
        }
        self
    }

    /// Get the decoding key for `kid`, refreshing the cache if stale
    ///
    /// Without a `kid` the first cached key is used. An unknown `kid`
    /// refetches the key set once (at most every rekey cooldown) so rotated
    /// provider keys are picked up before the next scheduled refresh.
    pub async fn key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        if self.needs_refresh().await {
            self.refresh().await?;
        }

        let found = self.cached_key(kid).await;
        if !matches!(found, Err(ClaimsError::KeyNotFound(_))) || kid.is_none() {
            return found;
        }
        if !self.can_rekey().await {
            return found;
        }

        debug!(kid = ?kid, "Unknown key id, refetching JWKS");
        self.refresh().await?;
        self.cached_key(kid).await
    }

    async fn cached_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        let cache = self.cache.read().await;
        let cache = cache
            .as_ref()
            .ok_or_else(|| ClaimsError::Discovery("JWKS cache empty after refresh".into()))?;

        let key = match kid {
            Some(kid) => cache.keys.get(kid).cloned(),
            None => cache.keys.values().next().cloned(),
        };

        key.ok_or_else(|| ClaimsError::KeyNotFound(format!("{:?}", kid)))
    }

    async fn can_rekey(&self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        match &*self.cache.read().await {
            None => true,
            Some(c) => c.fetched_at.elapsed() >= source.rekey_cooldown,
        }
    }

    async fn needs_refresh(&self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        match &*self.cache.read().await {
            None => true,
            Some(c) => c.fetched_at.elapsed() > source.refresh_interval,
        }
    }

    async fn refresh(&self) -> Result<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };

        debug!(url = %source.jwks_uri, "Fetching JWKS");

        let jwks: JwksDocument = source
            .http
            .get(&source.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ClaimsError::Discovery(format!("failed to fetch JWKS: {}", e)))?
            .json()
            .await
            .map_err(|e| ClaimsError::Discovery(format!("invalid JWKS response: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if let Some(key) = jwk_to_decoding_key(&jwk)? {
                let kid = jwk.kid.unwrap_or_else(|| "default".to_string());
                keys.insert(kid, key);
            }
        }

        if keys.is_empty() {
            return Err(ClaimsError::Config("no usable keys found in JWKS".into()));
        }

        info!(key_count = keys.len(), "Refreshed JWKS cache");

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}

/// Convert a JWK to a DecodingKey, skipping unsupported key types
fn jwk_to_decoding_key(jwk: &JwkKey) -> Result<Option<DecodingKey>> {
    let required = |field: &Option<String>, name: &str| {
        field
            .clone()
            .ok_or_else(|| ClaimsError::Config(format!("{} key missing '{}'", jwk.kty, name)))
    };

    match jwk.kty.as_str() {
        "RSA" => {
            let n = required(&jwk.n, "n")?;
            let e = required(&jwk.e, "e")?;
            DecodingKey::from_rsa_components(&n, &e)
                .map(Some)
                .map_err(|e| ClaimsError::Config(format!("invalid RSA key: {}", e)))
        }
        "EC" => {
            let crv = required(&jwk.crv, "crv")?;
            let x = required(&jwk.x, "x")?;
            let y = required(&jwk.y, "y")?;
            match crv.as_str() {
                "P-256" | "P-384" => DecodingKey::from_ec_components(&x, &y)
                    .map(Some)
                    .map_err(|e| ClaimsError::Config(format!("invalid EC {} key: {}", crv, e))),
                _ => {
                    warn!(crv = %crv, "Unsupported EC curve");
                    Ok(None)
                }
            }
        }
        kty => {
            warn!(kty = %kty, "Unsupported key type");
            Ok(None)
        }
    }
}
