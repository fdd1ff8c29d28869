//! Podgate - Pod API front-end with per-request Kubernetes impersonation

use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podgate_api::impersonation::{ClientFactory, KubeClientFactory};
use podgate_api::sequence::{seed_from_cluster, PodSequence};
use podgate_api::{start_server, AppState, Cli};
use podgate_auth::{ClaimsExtractor, TokenVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube and reqwest both need a process-wide rustls provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let verifier_config = cli.verifier_config()?;

    let kube_config = kube::Config::infer()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load Kubernetes config: {}", e))?;
    let clients = KubeClientFactory::new(kube_config)?;

    let claims = match verifier_config {
        Some(config) => {
            let verifier =
                TokenVerifier::discover(reqwest::Client::new(), config, cli.jwks_refresh_interval())
                    .await?;
            ClaimsExtractor::verified(Arc::new(verifier))
        }
        None => {
            warn!("Bearer token signatures are NOT verified; trusting upstream authentication");
            ClaimsExtractor::unverified()
        }
    };

    let sequence = if cli.seed_sequence_from_cluster {
        seed_from_cluster(clients.default_client().as_ref(), &cli.namespace).await?
    } else {
        PodSequence::new()
    };

    let state = AppState::new(
        Arc::new(clients),
        Arc::new(claims),
        Arc::new(sequence),
        cli.namespace.clone(),
    );

    start_server(cli.addr(), state).await?;
    Ok(())
}
