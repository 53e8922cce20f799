use std::path::PathBuf;

/// Errors raised while assembling or looking up a relying-party registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Failed to load {}: {reason}", path.display())]
    CertificateLoad { path: PathBuf, reason: String },

    #[error("Failed to resolve loopback host '{host}': {reason}")]
    HostnameResolution { host: String, reason: String },

    #[error("Invalid SAML credential: {0}")]
    Credential(String),

    #[error("No relying-party registration with id '{0}'")]
    NotFound(String),

    #[error("SAML metadata error: {0}")]
    Metadata(String),
}
