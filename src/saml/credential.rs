//! X.509 credentials attached to a relying-party registration.

use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};

use super::RegistrationError;

/// What a credential is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialUsage {
    /// Sign outgoing AuthnRequests and LogoutRequests (needs a private key).
    Signing,
    /// Decrypt incoming assertions (needs a private key).
    Decryption,
    /// Encrypt messages for the asserting party (certificate only).
    Encryption,
    /// Verify asserting-party signatures (certificate only).
    Verification,
}

impl CredentialUsage {
    pub fn requires_private_key(self) -> bool {
        matches!(self, Self::Signing | Self::Decryption)
    }
}

/// A certificate, an optional private key, and the usages they serve.
///
/// Signing and decryption credentials carry a private key that matches the
/// certificate; encryption and verification credentials never do.
#[derive(Clone)]
pub struct Saml2X509Credential {
    certificate: X509,
    private_key: Option<PKey<Private>>,
    usages: Vec<CredentialUsage>,
}

impl std::fmt::Debug for Saml2X509Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saml2X509Credential")
            .field("subject", &subject_of(&self.certificate))
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("usages", &self.usages)
            .finish()
    }
}

impl Saml2X509Credential {
    pub fn new(
        certificate: X509,
        private_key: Option<PKey<Private>>,
        usages: &[CredentialUsage],
    ) -> Result<Self, RegistrationError> {
        let Some(first) = usages.first() else {
            return Err(RegistrationError::Credential(
                "at least one usage is required".to_string(),
            ));
        };

        let needs_key = first.requires_private_key();
        if usages.iter().any(|u| u.requires_private_key() != needs_key) {
            return Err(RegistrationError::Credential(format!(
                "usages {usages:?} mix private-key and certificate-only kinds"
            )));
        }

        match (&private_key, needs_key) {
            (None, true) => {
                return Err(RegistrationError::Credential(format!(
                    "{first:?} credential requires a private key"
                )));
            }
            (Some(_), false) => {
                return Err(RegistrationError::Credential(format!(
                    "{first:?} credential must not carry a private key"
                )));
            }
            (Some(key), true) => {
                let cert_key = certificate
                    .public_key()
                    .map_err(|e| RegistrationError::Credential(e.to_string()))?;
                if !cert_key.public_eq(key) {
                    return Err(RegistrationError::Credential(format!(
                        "private key does not match certificate {}",
                        subject_of(&certificate)
                    )));
                }
            }
            (None, false) => {}
        }

        Ok(Self {
            certificate,
            private_key,
            usages: usages.to_vec(),
        })
    }

    pub fn signing(private_key: PKey<Private>, certificate: X509) -> Result<Self, RegistrationError> {
        Self::new(certificate, Some(private_key), &[CredentialUsage::Signing])
    }

    pub fn decryption(
        private_key: PKey<Private>,
        certificate: X509,
    ) -> Result<Self, RegistrationError> {
        Self::new(certificate, Some(private_key), &[CredentialUsage::Decryption])
    }

    pub fn encryption(certificate: X509) -> Result<Self, RegistrationError> {
        Self::new(certificate, None, &[CredentialUsage::Encryption])
    }

    pub fn verification(certificate: X509) -> Result<Self, RegistrationError> {
        Self::new(certificate, None, &[CredentialUsage::Verification])
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn private_key(&self) -> Option<&PKey<Private>> {
        self.private_key.as_ref()
    }

    pub fn usages(&self) -> &[CredentialUsage] {
        &self.usages
    }

    pub fn is_for(&self, usage: CredentialUsage) -> bool {
        self.usages.contains(&usage)
    }

    /// Base64 DER of the certificate, as embedded in metadata `X509Certificate` elements.
    pub fn certificate_base64(&self) -> Result<String, RegistrationError> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let der = self
            .certificate
            .to_der()
            .map_err(|e| RegistrationError::Credential(e.to_string()))?;
        Ok(STANDARD.encode(der))
    }
}

fn subject_of(certificate: &X509) -> String {
    certificate
        .subject_name()
        .entries()
        .filter_map(|entry| entry.data().as_utf8().ok().map(|s| s.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::{KeyMaterial, SelfSignedCertificateFactory};

    fn material(subject: &str) -> KeyMaterial {
        SelfSignedCertificateFactory::default()
            .generate(subject, 30)
            .unwrap()
    }

    #[test]
    fn test_signing_and_decryption_need_matching_key() {
        let app = material("app");

        let signing =
            Saml2X509Credential::signing(app.private_key().clone(), app.certificate().clone())
                .unwrap();
        assert!(signing.is_for(CredentialUsage::Signing));
        assert!(signing.private_key().is_some());

        let decryption =
            Saml2X509Credential::decryption(app.private_key().clone(), app.certificate().clone())
                .unwrap();
        assert_eq!(decryption.usages(), &[CredentialUsage::Decryption]);
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let app = material("app");
        let other = material("other");

        let err =
            Saml2X509Credential::signing(other.private_key().clone(), app.certificate().clone())
                .unwrap_err();
        assert!(matches!(err, RegistrationError::Credential(_)));
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_certificate_only_usages() {
        let idp = material("realm");

        let verification = Saml2X509Credential::verification(idp.certificate().clone()).unwrap();
        assert!(verification.private_key().is_none());
        assert!(verification.is_for(CredentialUsage::Verification));
        assert!(!verification.is_for(CredentialUsage::Signing));

        let err = Saml2X509Credential::new(
            idp.certificate().clone(),
            Some(idp.private_key().clone()),
            &[CredentialUsage::Encryption],
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not carry"));
    }

    #[test]
    fn test_usage_validation() {
        let app = material("app");

        let err = Saml2X509Credential::new(app.certificate().clone(), None, &[]).unwrap_err();
        assert!(err.to_string().contains("at least one usage"));

        let err = Saml2X509Credential::new(
            app.certificate().clone(),
            Some(app.private_key().clone()),
            &[CredentialUsage::Signing, CredentialUsage::Verification],
        )
        .unwrap_err();
        assert!(err.to_string().contains("mix"));

        let err = Saml2X509Credential::new(
            app.certificate().clone(),
            None,
            &[CredentialUsage::Signing],
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires a private key"));
    }

    #[test]
    fn test_certificate_base64_matches_key_material() {
        let idp = material("realm");
        let credential = Saml2X509Credential::encryption(idp.certificate().clone()).unwrap();
        assert_eq!(
            credential.certificate_base64().unwrap(),
            idp.certificate_base64().unwrap()
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let app = material("app");
        let credential =
            Saml2X509Credential::signing(app.private_key().clone(), app.certificate().clone())
                .unwrap();
        let debug = format!("{credential:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("app"));
    }
}
