//! Podgate login
//!
//! Minimal OIDC authorization-code flow: hands out the provider's login URL,
//! exchanges the returned code for tokens, verifies the ID token and shows
//! the result. Used to obtain bearer tokens for the Pod API.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod handlers;
pub mod provider;
pub mod server;

pub use config::Cli;
pub use error::{Error, Result};
pub use exchange::{OidcTokenExchange, TokenExchange, TokenResponse};
pub use handlers::LoginState;
pub use provider::{LoginSettings, ProviderEndpoints};
pub use server::{router, start_server};
