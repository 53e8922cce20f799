//! SAML2 relying-party registration for the embedded Keycloak realm.
//!
//! The registration is assembled from configuration and the PEM files
//! written by [`crate::bootstrap`], then served from a
//! [`RelyingPartyRegistrationRepository`].

mod builder;
mod credential;
mod error;
pub mod metadata;
mod registration;
mod repository;

pub use builder::*;
pub use credential::{CredentialUsage, Saml2X509Credential};
pub use error::RegistrationError;
pub use registration::{AssertingPartyMetadata, RelyingPartyRegistration};
pub use repository::*;
