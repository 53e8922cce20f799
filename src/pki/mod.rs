//! Key pair and self-signed certificate generation.

mod certificate;
mod error;
pub mod pem;
mod provider;

pub use certificate::{KeyMaterial, RSA_KEY_BITS, SelfSignedCertificateFactory};
pub use error::PkiError;
pub use provider::{CryptoProvider, OpensslProvider};
