//! Kubernetes access clients
//!
//! An access client issues Pod calls under exactly one identity: the
//! service's own credential, or a caller it impersonates. Handlers only see
//! the [`PodClient`] trait so tests can substitute a recording double.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use podgate_auth::IdentityClaims;
use serde::{Deserialize, Serialize};

/// Identity a client impersonates on the Kubernetes API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Impersonated user name (`Impersonate-User`)
    pub username: String,
    /// Impersonated groups (`Impersonate-Group`)
    pub groups: Vec<String>,
}

impl From<IdentityClaims> for UserIdentity {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            username: claims.subject,
            groups: claims.groups,
        }
    }
}

/// Which identity an access client acts as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity {
    /// The service's own in-cluster credential
    ServiceAccount,
    /// A caller, impersonated with their own bearer token
    Impersonated(UserIdentity),
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::ServiceAccount => f.write_str("service-account"),
            ClientIdentity::Impersonated(user) => write!(f, "user:{}", user.username),
        }
    }
}

/// Failure reported by the Kubernetes API (or a stand-in)
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PodApiError(pub String);

impl From<kube::Error> for PodApiError {
    fn from(e: kube::Error) -> Self {
        PodApiError(e.to_string())
    }
}

/// Pod operations against the orchestration API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Identity this client acts as
    fn identity(&self) -> ClientIdentity;

    /// Create a Pod in `namespace`
    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, PodApiError>;

    /// List Pods in `namespace`, in the order the API returns them
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, PodApiError>;

    /// Read one Pod by name
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, PodApiError>;
}

/// [`PodClient`] backed by a `kube::Client`
pub struct KubePodClient {
    client: Client,
    identity: ClientIdentity,
}

impl KubePodClient {
    /// Wrap a client that already carries `identity`'s credentials
    pub fn new(client: Client, identity: ClientIdentity) -> Self {
        Self { client, identity }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PodClient for KubePodClient {
    fn identity(&self) -> ClientIdentity {
        self.identity.clone()
    }

    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, PodApiError> {
        Ok(self
            .pods(namespace)
            .create(&PostParams::default(), &pod)
            .await?)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, PodApiError> {
        Ok(self
            .pods(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, PodApiError> {
        Ok(self.pods(namespace).get(name).await?)
    }
}
