//! SAML2 security chain for axum applications.
//!
//! [`SecurityChainComposer`] wraps an application [`axum::Router`] so that
//! every request needs a SAML-backed session, and mounts the login, logout
//! and service-provider metadata endpoints next to it.

mod composer;
mod error;
mod matcher;
pub mod routes;
mod session;

pub use composer::SecurityChainComposer;
pub use error::SecurityError;
pub use matcher::PathPattern;
pub use routes::SecurityState;
pub use session::{PENDING_AUTHENTICATION_TTL_SECS, PendingAuthentication, SamlSession, SessionStore};
