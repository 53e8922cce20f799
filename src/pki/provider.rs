//! Crypto provider handle injected into the certificate factory.

use openssl::{
    hash::MessageDigest,
    pkey::{PKey, Private},
    rsa::Rsa,
};

use super::PkiError;

/// Source of key pairs and the signature digest used for self-signing.
///
/// The factory never reaches for a process-wide provider; callers hand it one
/// of these at construction.
pub trait CryptoProvider: Send + Sync {
    /// Generate an RSA key pair of the given modulus size.
    fn generate_rsa(&self, bits: u32) -> Result<PKey<Private>, PkiError>;

    /// Digest paired with RSA for certificate signatures.
    fn signature_digest(&self) -> MessageDigest;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Provider backed by the system OpenSSL library.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslProvider;

impl CryptoProvider for OpensslProvider {
    fn generate_rsa(&self, bits: u32) -> Result<PKey<Private>, PkiError> {
        let rsa = Rsa::generate(bits).map_err(PkiError::CryptoUnavailable)?;
        PKey::from_rsa(rsa).map_err(PkiError::CryptoUnavailable)
    }

    fn signature_digest(&self) -> MessageDigest {
        MessageDigest::sha256()
    }

    fn name(&self) -> &'static str {
        "openssl"
    }
}
