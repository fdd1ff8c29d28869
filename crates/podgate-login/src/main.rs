//! Podgate login - OIDC authorization-code flow for obtaining bearer tokens

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podgate_login::provider::authorization_url;
use podgate_login::{start_server, Cli, LoginState, OidcTokenExchange, ProviderEndpoints};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let http = reqwest::Client::new();

    let endpoints = ProviderEndpoints::discover(&http, &cli.issuer_url).await?;
    let url = authorization_url(&endpoints, &settings)?;

    let state = LoginState {
        authorization_url: url.to_string(),
        expected_state: settings.state.clone(),
        exchange: Arc::new(OidcTokenExchange::from_endpoints(http, &endpoints, settings)),
    };

    start_server(cli.addr(), state).await?;
    Ok(())
}
