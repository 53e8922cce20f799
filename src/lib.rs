//! Keycloak SAML2 relying-party plugin.
//!
//! Bootstraps a Keycloak realm document and self-signed credentials for both
//! sides of a SAML2 trust relationship, builds the relying-party registration
//! from them, and secures an axum application with it.

pub mod bootstrap;
pub mod config;
#[cfg(feature = "server")]
pub mod observability;
pub mod pki;
pub mod saml;
pub mod security;
pub mod utils;
