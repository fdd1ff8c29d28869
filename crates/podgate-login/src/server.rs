//! Login server

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::error::{Error, Result};
use crate::handlers::{callback, index, LoginState};

/// Path the provider redirects back to
pub const CALLBACK_PATH: &str = "/authorization-code/callback";

/// Build the login router
pub fn router(state: LoginState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(CALLBACK_PATH, get(callback))
        .with_state(state)
}

/// Start the login server
pub async fn start_server(addr: SocketAddr, state: LoginState) -> Result<()> {
    info!(addr = %addr, "Starting login server");

    axum_server::bind(addr)
        .serve(router(state).into_make_service())
        .await
        .map_err(|e| Error::Config(format!("Server error: {}", e)))
}
