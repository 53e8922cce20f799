/// Errors from key and certificate generation or decoding.
#[derive(Debug, thiserror::Error)]
pub enum PkiError {
    #[error("Invalid certificate request: {0}")]
    InvalidRequest(String),

    #[error("Cryptographic primitives unavailable: {0}")]
    CryptoUnavailable(#[source] openssl::error::ErrorStack),

    #[error("Failed to build certificate for CN={subject}: {source}")]
    CertificateBuild {
        subject: String,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("Failed to encode key material: {0}")]
    Encoding(#[source] openssl::error::ErrorStack),

    #[error("Malformed PEM ({label}): {reason}")]
    Pem { label: &'static str, reason: String },
}
