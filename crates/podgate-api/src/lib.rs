//! Podgate Pod API
//!
//! A small HTTP front-end that creates, lists and reads Pods on behalf of
//! callers, impersonating the caller's identity on the Kubernetes API.
//!
//! # Architecture
//!
//! ```text
//! client ──► impersonation ──► pod handler ──► K8s API Server
//!            (Bearer claims)   (request-local   (Impersonate-User /
//!                               access client)   Impersonate-Group)
//! ```
//!
//! The resolved access client travels in the request's extensions, never in
//! shared server state, so concurrent callers cannot see each other's
//! identities.
//!
//! # Endpoints
//!
//! - `POST /api/v1/pods` - Create a placeholder Pod named `pod<N>`
//! - `GET /api/v1/pods` - List Pod names in the namespace
//! - `GET /api/v1/pods/{name}` - Read a single Pod's phase
//! - `GET /healthz` - Health check

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod impersonation;
pub mod pods;
pub mod sequence;
pub mod server;

pub use client::{ClientIdentity, KubePodClient, PodApiError, PodClient, UserIdentity};
pub use config::Cli;
pub use error::{Error, Result};
pub use impersonation::{AccessClient, ClientFactory, KubeClientFactory};
pub use sequence::PodSequence;
pub use server::{router, start_server, AppState};
