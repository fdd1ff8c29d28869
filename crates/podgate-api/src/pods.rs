//! Pod resource handlers
//!
//! Each handler runs with the access client that identity resolution bound
//! to the request and issues exactly one Kubernetes call, with no retries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use kube::api::ObjectMeta;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::impersonation::AccessClient;
use crate::server::AppState;

/// Container name of the placeholder workload
pub const NOOP_CONTAINER_NAME: &str = "noop";

/// Image of the placeholder workload
pub const NOOP_IMAGE: &str = "busybox";

/// Command of the placeholder workload
pub const NOOP_COMMAND: [&str; 3] = [
    "/bin/sh",
    "-c",
    "while true; do echo 'noop'; sleep 10; done",
];

/// Response to a successful create
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// Human-readable confirmation naming the Pod
    pub message: String,
}

/// Response to a list
#[derive(Debug, Serialize, Deserialize)]
pub struct PodListResponse {
    /// Pod names in API order
    pub pods: Vec<String>,
}

/// Response to a get
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    /// Pod name
    pub name: String,
    /// Pod namespace
    pub namespace: String,
    /// Pod phase (empty until the kubelet reports one)
    pub status: String,
}

impl From<&Pod> for PodSummary {
    fn from(pod: &Pod) -> Self {
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            status: pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_default(),
        }
    }
}

/// Placeholder Pod that idles forever
pub fn noop_pod(name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: NOOP_CONTAINER_NAME.to_string(),
                image: Some(NOOP_IMAGE.to_string()),
                command: Some(NOOP_COMMAND.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `POST /api/v1/pods`
///
/// The sequence number is reserved before the create and is not returned on
/// failure, so a failed create permanently consumes its name.
pub async fn create_pod(
    State(state): State<AppState>,
    Extension(AccessClient(client)): Extension<AccessClient>,
) -> Result<(StatusCode, Json<CreatedResponse>), Error> {
    let name = state.sequence.next_name();

    debug!(
        pod = %name,
        namespace = %state.namespace,
        identity = %client.identity(),
        "Creating pod"
    );

    client
        .create_pod(&state.namespace, noop_pod(&name))
        .await
        .map_err(|e| {
            warn!(pod = %name, error = %e, "Pod create failed");
            Error::CreateFailed(e.to_string())
        })?;

    info!(pod = %name, namespace = %state.namespace, "Pod created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: format!("Pod {} created", name),
        }),
    ))
}

/// `GET /api/v1/pods`
pub async fn list_pods(
    State(state): State<AppState>,
    Extension(AccessClient(client)): Extension<AccessClient>,
) -> Result<Json<PodListResponse>, Error> {
    let pods = client
        .list_pods(&state.namespace)
        .await
        .map_err(|e| Error::ListFailed(e.to_string()))?;

    debug!(
        namespace = %state.namespace,
        count = pods.len(),
        identity = %client.identity(),
        "Listed pods"
    );

    Ok(Json(PodListResponse {
        pods: pods
            .into_iter()
            .map(|p| p.metadata.name.unwrap_or_default())
            .collect(),
    }))
}

/// `GET /api/v1/pods/{name}`
///
/// Any lookup failure maps to 404, not only a genuine not-found.
pub async fn get_pod(
    State(state): State<AppState>,
    Extension(AccessClient(client)): Extension<AccessClient>,
    Path(name): Path<String>,
) -> Result<Json<PodSummary>, Error> {
    let pod = client
        .get_pod(&state.namespace, &name)
        .await
        .map_err(|e| Error::PodNotFound {
            name: name.clone(),
            message: e.to_string(),
        })?;

    Ok(Json(PodSummary::from(&pod)))
}
