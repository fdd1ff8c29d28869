//! Login flow handlers

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::exchange::{TokenExchange, TokenResponse};

/// Shared state for the login handlers
#[derive(Clone)]
pub struct LoginState {
    /// Pre-built authorization URL served on `/`
    pub authorization_url: String,
    /// State value the callback must echo back
    pub expected_state: String,
    /// Provider client
    pub exchange: Arc<dyn TokenExchange>,
}

/// Query parameters on the provider's redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Echoed anti-forgery state
    #[serde(default)]
    pub state: Option<String>,
    /// Authorization code
    #[serde(default)]
    pub code: Option<String>,
}

/// `GET /`
pub async fn index(State(state): State<LoginState>) -> String {
    format!(
        "Visit the following URL to authenticate:\n\n{}",
        state.authorization_url
    )
}

/// `GET /authorization-code/callback`
pub async fn callback(
    State(state): State<LoginState>,
    Query(params): Query<CallbackParams>,
) -> Result<String> {
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        warn!("Callback state mismatch");
        return Err(Error::StateMismatch);
    }

    let code = params.code.unwrap_or_default();
    let tokens = state.exchange.exchange(&code).await?;

    let id_token = tokens.id_token.clone().ok_or(Error::MissingIdToken)?;
    let claims = state.exchange.verify_id_token(&id_token).await?;

    let subject = claims
        .get("sub")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    info!(subject = %subject, "Login complete");

    Ok(render(&tokens, &id_token, &claims))
}

fn render(tokens: &TokenResponse, id_token: &str, claims: &Map<String, Value>) -> String {
    let claims = serde_json::to_string_pretty(claims).unwrap_or_default();
    format!(
        "Access Token:\n{}\n\nRefresh Token:\n{}\n\nID Token:\n{}\n\nClaims:\n{}\n",
        tokens.access_token,
        tokens.refresh_token.as_deref().unwrap_or_default(),
        id_token,
        claims
    )
}
