//! Command-line configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use podgate_auth::VerifierConfig;

use crate::error::{Error, Result};

/// Podgate - Pod API front-end with per-request Kubernetes impersonation
#[derive(Parser, Debug, Clone)]
#[command(name = "podgate", version, about, long_about = None)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "PODGATE_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PODGATE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Namespace all Pod operations target
    #[arg(long, env = "PODGATE_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Verify bearer token signatures against the OIDC issuer's JWKS
    ///
    /// Off by default: tokens are decoded without verification and
    /// authenticity is left to the gateway in front of podgate.
    #[arg(long, env = "PODGATE_VERIFY_TOKENS")]
    pub verify_tokens: bool,

    /// OIDC issuer URL (required with --verify-tokens)
    #[arg(long, env = "PODGATE_OIDC_ISSUER_URL")]
    pub oidc_issuer_url: Option<String>,

    /// Accepted token audiences (required with --verify-tokens)
    #[arg(
        long = "oidc-audience",
        env = "PODGATE_OIDC_AUDIENCES",
        value_delimiter = ','
    )]
    pub oidc_audiences: Vec<String>,

    /// JWKS refresh interval in seconds
    #[arg(long, env = "PODGATE_JWKS_REFRESH_SECS", default_value_t = 3600)]
    pub jwks_refresh_secs: u64,

    /// Continue pod numbering after the highest existing `pod<N>` in the namespace
    ///
    /// Without this the sequence restarts at pod1 on every start.
    #[arg(long, env = "PODGATE_SEED_SEQUENCE_FROM_CLUSTER")]
    pub seed_sequence_from_cluster: bool,
}

impl Cli {
    /// Listen address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// JWKS refresh interval
    pub fn jwks_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.jwks_refresh_secs)
    }

    /// Token verification settings, if verification is enabled
    pub fn verifier_config(&self) -> Result<Option<VerifierConfig>> {
        if !self.verify_tokens {
            return Ok(None);
        }

        let issuer_url = self
            .oidc_issuer_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::Config("--oidc-issuer-url is required with --verify-tokens".into())
            })?;

        if self.oidc_audiences.is_empty() {
            return Err(Error::Config(
                "--oidc-audience is required with --verify-tokens".into(),
            ));
        }

        Ok(Some(VerifierConfig {
            issuer_url,
            audiences: self.oidc_audiences.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["podgate"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.addr(), "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cli.namespace, "default");
        assert!(!cli.verify_tokens);
        assert!(!cli.seed_sequence_from_cluster);
        assert!(cli.verifier_config().unwrap().is_none());
    }

    #[test]
    fn test_verify_requires_issuer() {
        let cli = parse(&["--verify-tokens", "--oidc-audience", "podgate"]);
        let err = cli.verifier_config().unwrap_err();
        assert!(err.to_string().contains("--oidc-issuer-url"));
    }

    #[test]
    fn test_verify_requires_audience() {
        let cli = parse(&[
            "--verify-tokens",
            "--oidc-issuer-url",
            "https://idp.example.com",
        ]);
        let err = cli.verifier_config().unwrap_err();
        assert!(err.to_string().contains("--oidc-audience"));
    }

    #[test]
    fn test_verifier_config() {
        let cli = parse(&[
            "--verify-tokens",
            "--oidc-issuer-url",
            "https://idp.example.com",
            "--oidc-audience",
            "podgate,kubernetes",
        ]);
        let config = cli.verifier_config().unwrap().unwrap();
        assert_eq!(config.issuer_url, "https://idp.example.com");
        assert_eq!(config.audiences, vec!["podgate", "kubernetes"]);
    }
}
