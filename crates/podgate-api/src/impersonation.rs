//! Per-request identity resolution
//!
//! Runs ahead of every Pod handler and decides which access client the
//! request uses:
//!
//! - No `Authorization` header: the service's default client.
//! - `Bearer <token>`: a fresh client that authenticates with the caller's
//!   token and impersonates the token's subject and groups.
//! - Anything else: 401.
//!
//! The chosen client is inserted into the request's extensions. It is never
//! written to shared state, so one caller's impersonated client cannot leak
//! into another caller's request.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use kube::{Client, Config};
use podgate_auth::ClaimsExtractor;
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::client::{ClientIdentity, KubePodClient, PodClient, UserIdentity};
use crate::error::{Error, Result};
use crate::server::AppState;

/// Required Authorization scheme prefix (case-sensitive, single space)
pub const BEARER_PREFIX: &str = "Bearer ";

/// Access client bound to the current request
#[derive(Clone)]
pub struct AccessClient(pub Arc<dyn PodClient>);

/// Builds access clients for the default and impersonated identities
#[cfg_attr(test, mockall::automock)]
pub trait ClientFactory: Send + Sync {
    /// Client acting as the service itself
    fn default_client(&self) -> Arc<dyn PodClient>;

    /// New client that presents `token` and impersonates `identity`
    fn impersonated_client(
        &self,
        token: &str,
        identity: &UserIdentity,
    ) -> Result<Arc<dyn PodClient>>;
}

/// [`ClientFactory`] deriving clients from a base `kube::Config`
pub struct KubeClientFactory {
    base: Config,
    default: Arc<dyn PodClient>,
}

impl KubeClientFactory {
    /// Create the factory and its default client from `base`
    pub fn new(base: Config) -> Result<Self> {
        let client = Client::try_from(base.clone())
            .map_err(|e| Error::Config(format!("Failed to create Kubernetes client: {}", e)))?;

        Ok(Self {
            base,
            default: Arc::new(KubePodClient::new(client, ClientIdentity::ServiceAccount)),
        })
    }
}

impl ClientFactory for KubeClientFactory {
    fn default_client(&self) -> Arc<dyn PodClient> {
        self.default.clone()
    }

    fn impersonated_client(
        &self,
        token: &str,
        identity: &UserIdentity,
    ) -> Result<Arc<dyn PodClient>> {
        let config = impersonation_config(&self.base, token, identity);
        let client =
            Client::try_from(config).map_err(|e| Error::ClientConstruction(e.to_string()))?;

        Ok(Arc::new(KubePodClient::new(
            client,
            ClientIdentity::Impersonated(identity.clone()),
        )))
    }
}

/// Derive a config that authenticates with `token` and impersonates `identity`
///
/// Every other credential on the base config (token file, basic auth, exec
/// and auth-provider plugins, client certificate and key) is dropped so the
/// caller's token is the only one presented.
pub fn impersonation_config(base: &Config, token: &str, identity: &UserIdentity) -> Config {
    let mut config = base.clone();
    let auth = &mut config.auth_info;

    auth.token = Some(SecretString::from(token.to_string()));
    auth.token_file = None;
    auth.username = None;
    auth.password = None;
    auth.exec = None;
    auth.auth_provider = None;
    auth.client_certificate = None;
    auth.client_certificate_data = None;
    auth.client_key = None;
    auth.client_key_data = None;

    auth.impersonate = Some(identity.username.clone());
    auth.impersonate_groups = if identity.groups.is_empty() {
        None
    } else {
        Some(identity.groups.clone())
    };

    config
}

/// Pick the access client for a request from its headers
pub async fn resolve_client(
    factory: &dyn ClientFactory,
    claims: &ClaimsExtractor,
    headers: &HeaderMap,
) -> Result<Arc<dyn PodClient>> {
    let header = match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => {
            debug!("No Authorization header, using default client");
            return Ok(factory.default_client());
        }
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| Error::Unauthorized("Invalid Authorization header format".into()))?;

    let identity: UserIdentity = claims
        .extract(token)
        .await
        .map_err(|e| Error::Unauthorized(format!("Failed to decode token: {}", e)))?
        .into();

    debug!(
        user = %identity.username,
        groups = ?identity.groups,
        "Impersonating caller"
    );

    factory.impersonated_client(token, &identity)
}

/// Middleware binding the resolved access client to the request
pub async fn impersonation_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let client = resolve_client(state.clients.as_ref(), &state.claims, request.headers())
        .await
        .inspect_err(|e| warn!(error = %e, "Rejected request during identity resolution"))?;

    request.extensions_mut().insert(AccessClient(client));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPodClient;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use secrecy::ExposeSecret;

    fn token_for(payload: serde_json::Value) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn mock_client(identity: ClientIdentity) -> Arc<dyn PodClient> {
        let mut client = MockPodClient::new();
        client.expect_identity().return_const(identity);
        Arc::new(client)
    }

    fn default_only_factory() -> MockClientFactory {
        let mut factory = MockClientFactory::new();
        factory
            .expect_default_client()
            .times(1)
            .returning(|| mock_client(ClientIdentity::ServiceAccount));
        factory.expect_impersonated_client().never();
        factory
    }

    fn base_config() -> Config {
        let mut config = Config::new("https://kubernetes.default.svc".parse().unwrap());
        config.auth_info.token = Some(SecretString::from("service-token".to_string()));
        config
    }

    fn identity(username: &str, groups: &[&str]) -> UserIdentity {
        UserIdentity {
            username: username.into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    // ========================================================================
    // Header handling
    // ========================================================================

    #[tokio::test]
    async fn test_missing_header_uses_default_client() {
        let factory = default_only_factory();
        let client = resolve_client(&factory, &ClaimsExtractor::unverified(), &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(client.identity(), ClientIdentity::ServiceAccount);
    }

    #[tokio::test]
    async fn test_empty_header_uses_default_client() {
        let factory = default_only_factory();
        let client = resolve_client(&factory, &ClaimsExtractor::unverified(), &headers_with(""))
            .await
            .unwrap();
        assert_eq!(client.identity(), ClientIdentity::ServiceAccount);
    }

    #[tokio::test]
    async fn test_wrong_scheme_is_unauthorized() {
        let mut factory = MockClientFactory::new();
        factory.expect_default_client().never();
        factory.expect_impersonated_client().never();

        for value in ["Token abc", "bearer abc", "Bearer", "Bearer\tabc", "Basic dTpw"] {
            let err = match resolve_client(
                &factory,
                &ClaimsExtractor::unverified(),
                &headers_with(value),
            )
            .await
            {
                Err(e) => e,
                Ok(_) => panic!("header {:?} should be rejected", value),
            };
            assert!(matches!(err, Error::Unauthorized(_)));
            assert_eq!(err.to_string(), "Invalid Authorization header format");
        }
    }

    #[tokio::test]
    async fn test_missing_sub_is_unauthorized() {
        let mut factory = MockClientFactory::new();
        factory.expect_impersonated_client().never();

        let header = format!("Bearer {}", token_for(serde_json::json!({"groups": ["g1"]})));
        let err = match resolve_client(
            &factory,
            &ClaimsExtractor::unverified(),
            &headers_with(&header),
        )
        .await
        {
            Err(e) => e,
            Ok(_) => panic!("token without sub should be rejected"),
        };

        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("sub claim"));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let mut factory = MockClientFactory::new();
        factory.expect_impersonated_client().never();

        let err = match resolve_client(
            &factory,
            &ClaimsExtractor::unverified(),
            &headers_with("Bearer not-a-jwt"),
        )
        .await
        {
            Err(e) => e,
            Ok(_) => panic!("malformed token should be rejected"),
        };
        assert!(err.to_string().starts_with("Failed to decode token"));
    }

    #[tokio::test]
    async fn test_bearer_token_impersonates_claims() {
        let token = token_for(serde_json::json!({"sub": "u1", "groups": ["g1", "g2"]}));
        let expected_token = token.clone();

        let mut factory = MockClientFactory::new();
        factory.expect_default_client().never();
        factory
            .expect_impersonated_client()
            .withf(move |tok, id| tok == expected_token && *id == identity("u1", &["g1", "g2"]))
            .times(1)
            .returning(|_, id| Ok(mock_client(ClientIdentity::Impersonated(id.clone()))));

        let client = resolve_client(
            &factory,
            &ClaimsExtractor::unverified(),
            &headers_with(&format!("Bearer {}", token)),
        )
        .await
        .unwrap();

        assert_eq!(
            client.identity(),
            ClientIdentity::Impersonated(identity("u1", &["g1", "g2"]))
        );
    }

    #[tokio::test]
    async fn test_construction_failure_is_internal_error() {
        let mut factory = MockClientFactory::new();
        factory
            .expect_impersonated_client()
            .returning(|_, _| Err(Error::ClientConstruction("bad TLS config".into())));

        let header = format!("Bearer {}", token_for(serde_json::json!({"sub": "alice"})));
        let err = match resolve_client(
            &factory,
            &ClaimsExtractor::unverified(),
            &headers_with(&header),
        )
        .await
        {
            Err(e) => e,
            Ok(_) => panic!("construction failure should propagate"),
        };

        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("bad TLS config"));
    }

    // ========================================================================
    // Impersonation config
    // ========================================================================

    #[test]
    fn test_impersonation_config_sets_identity_and_token() {
        let config = impersonation_config(&base_config(), "caller-token", &identity("u1", &["g1", "g2"]));

        assert_eq!(config.auth_info.impersonate.as_deref(), Some("u1"));
        assert_eq!(
            config.auth_info.impersonate_groups,
            Some(vec!["g1".to_string(), "g2".to_string()])
        );
        assert_eq!(
            config
                .auth_info
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            Some("caller-token".to_string())
        );
    }

    #[test]
    fn test_impersonation_config_drops_service_credentials() {
        let mut base = base_config();
        base.auth_info.token_file =
            Some("/var/run/secrets/kubernetes.io/serviceaccount/token".into());
        base.auth_info.username = Some("admin".into());
        base.auth_info.client_certificate = Some("/etc/podgate/client.crt".into());
        base.auth_info.client_certificate_data = Some("Y2VydA==".into());
        base.auth_info.client_key = Some("/etc/podgate/client.key".into());
        base.auth_info.client_key_data = Some(SecretString::from("a2V5".to_string()));

        let config = impersonation_config(&base, "caller-token", &identity("u1", &[]));
        let auth = &config.auth_info;

        assert!(auth.token_file.is_none());
        assert!(auth.username.is_none());
        assert!(auth.client_certificate.is_none());
        assert!(auth.client_certificate_data.is_none());
        assert!(auth.client_key.is_none());
        assert!(auth.client_key_data.is_none());
        assert_eq!(
            auth.token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("caller-token".to_string())
        );
    }

    #[test]
    fn test_impersonation_config_without_groups() {
        let config = impersonation_config(&base_config(), "t", &identity("alice", &[]));
        assert_eq!(config.auth_info.impersonate.as_deref(), Some("alice"));
        assert!(config.auth_info.impersonate_groups.is_none());
    }

    #[test]
    fn test_impersonation_config_keeps_cluster_settings() {
        let base = base_config();
        let config = impersonation_config(&base, "t", &identity("alice", &[]));
        assert_eq!(config.cluster_url, base.cluster_url);
        assert_eq!(config.default_namespace, base.default_namespace);
        assert!(base.auth_info.impersonate.is_none());
    }

    #[tokio::test]
    async fn test_kube_factory_builds_distinct_clients() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let factory = KubeClientFactory::new(base_config()).unwrap();
        assert_eq!(factory.default_client().identity(), ClientIdentity::ServiceAccount);

        let alice = factory
            .impersonated_client("t1", &identity("alice", &["dev"]))
            .unwrap();
        let bob = factory
            .impersonated_client("t2", &identity("bob", &[]))
            .unwrap();

        assert_eq!(
            alice.identity(),
            ClientIdentity::Impersonated(identity("alice", &["dev"]))
        );
        assert_eq!(
            bob.identity(),
            ClientIdentity::Impersonated(identity("bob", &[]))
        );
        assert!(!Arc::ptr_eq(&alice, &bob));
    }
}
