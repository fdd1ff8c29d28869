//! Command-line configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use secrecy::SecretString;

use crate::provider::LoginSettings;

/// Default callback location registered with the provider
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/authorization-code/callback";

/// Podgate login - OIDC authorization-code flow for obtaining bearer tokens
#[derive(Parser, Debug, Clone)]
#[command(name = "podgate-login", version, about, long_about = None)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "PODGATE_LOGIN_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PODGATE_LOGIN_PORT", default_value_t = 8080)]
    pub port: u16,

    /// OIDC issuer URL
    #[arg(long, env = "PODGATE_LOGIN_ISSUER_URL")]
    pub issuer_url: String,

    /// OAuth2 client id (also the expected ID token audience)
    #[arg(long, env = "PODGATE_LOGIN_CLIENT_ID")]
    pub client_id: String,

    /// OAuth2 client secret
    #[arg(long, env = "PODGATE_LOGIN_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: SecretString,

    /// Callback URL registered with the provider
    #[arg(long, env = "PODGATE_LOGIN_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    /// Fixed `state` value sent with the login URL and expected on callback
    #[arg(long, env = "PODGATE_LOGIN_STATE", default_value = "randomstate123")]
    pub state: String,
}

impl Cli {
    /// Listen address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Client registration settings
    pub fn settings(&self) -> LoginSettings {
        LoginSettings {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            state: self.state.clone(),
        }
    }
}
