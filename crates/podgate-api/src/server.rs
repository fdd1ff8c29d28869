//! Pod API server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use podgate_auth::ClaimsExtractor;
use tracing::info;

use crate::error::Error;
use crate::impersonation::{impersonation_middleware, ClientFactory};
use crate::pods::{create_pod, get_pod, list_pods};
use crate::sequence::PodSequence;

/// Shared state for handlers
///
/// Holds nothing request-specific: the per-request access client lives in
/// the request's extensions.
#[derive(Clone)]
pub struct AppState {
    /// Builds default and impersonated access clients
    pub clients: Arc<dyn ClientFactory>,
    /// Turns bearer tokens into identity claims
    pub claims: Arc<ClaimsExtractor>,
    /// Pod name generator
    pub sequence: Arc<PodSequence>,
    /// Namespace all Pod operations target
    pub namespace: String,
}

impl AppState {
    /// Assemble handler state
    pub fn new(
        clients: Arc<dyn ClientFactory>,
        claims: Arc<ClaimsExtractor>,
        sequence: Arc<PodSequence>,
        namespace: String,
    ) -> Self {
        Self {
            clients,
            claims,
            sequence,
            namespace,
        }
    }
}

/// Build the application router
///
/// Identity resolution is a route layer, so it runs only for matched Pod
/// routes and always completes before the handler.
pub fn router(state: AppState) -> Router {
    let pods = Router::new()
        .route("/api/v1/pods", post(create_pod).get(list_pods))
        .route("/api/v1/pods/{name}", get(get_pod))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            impersonation_middleware,
        ));

    Router::new()
        // Health check
        .route("/healthz", get(|| async { "ok" }))
        .merge(pods)
        .with_state(state)
}

/// Start the Pod API server
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<(), Error> {
    let namespace = state.namespace.clone();
    let verified = state.claims.verifies_signatures();
    let app = router(state);

    info!(
        addr = %addr,
        namespace = %namespace,
        verify_tokens = verified,
        "Starting podgate server"
    );

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
