//! Podgate identity primitives
//!
//! Turns bearer credentials into identity claims (subject + groups).
//!
//! Two trust modes are supported:
//! - **Unverified**: the token payload is decoded without checking the
//!   signature or expiry. Authenticity is delegated to the upstream identity
//!   provider or gateway in front of the proxy.
//! - **Verified**: the token is validated against the issuer's JWKS before
//!   its claims are trusted.
//!
//! The same JWKS machinery backs ID token verification in the login server.

#![deny(missing_docs)]

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod verifier;

pub use claims::{decode_unverified, IdentityClaims};
pub use error::{ClaimsError, Result};
pub use extractor::{ClaimsExtractor, TokenTrust};
pub use jwks::{JwksCache, OidcDiscovery};
pub use verifier::{TokenVerifier, VerifierConfig};
