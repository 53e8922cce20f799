//! The relying-party registration and its asserting-party details.

use openssl::pkey::{PKey, Private};
use samael::service_provider::{ServiceProvider, ServiceProviderBuilder};

use super::{CredentialUsage, RegistrationError, Saml2X509Credential, metadata};

/// Identity-provider side of a registration.
#[derive(Debug, Clone)]
pub struct AssertingPartyMetadata {
    pub entity_id: String,
    pub single_sign_on_service_location: String,
    pub single_logout_service_location: String,
    pub want_authn_requests_signed: bool,
    pub encryption_credentials: Vec<Saml2X509Credential>,
    pub verification_credentials: Vec<Saml2X509Credential>,
}

/// A service-provider registration against one asserting party.
///
/// Built once per process and read without mutation afterwards.
#[derive(Debug, Clone)]
pub struct RelyingPartyRegistration {
    pub registration_id: String,
    /// SP entity id (the Keycloak client id).
    pub entity_id: String,
    pub assertion_consumer_service_location: String,
    pub single_logout_service_location: String,
    pub signing_credentials: Vec<Saml2X509Credential>,
    pub decryption_credentials: Vec<Saml2X509Credential>,
    pub asserting_party: AssertingPartyMetadata,
}

impl RelyingPartyRegistration {
    /// Private key of the first signing credential.
    pub fn signing_key(&self) -> Result<&PKey<Private>, RegistrationError> {
        self.signing_credentials
            .iter()
            .filter(|c| c.is_for(CredentialUsage::Signing))
            .find_map(|c| c.private_key())
            .ok_or_else(|| {
                RegistrationError::Credential(format!(
                    "registration '{}' has no signing credential",
                    self.registration_id
                ))
            })
    }

    /// Service-provider metadata document for this registration.
    pub fn service_provider_metadata(&self) -> Result<String, RegistrationError> {
        metadata::service_provider_metadata(self)
    }

    /// A `samael` service provider configured for this registration.
    pub fn service_provider(&self) -> Result<ServiceProvider, RegistrationError> {
        let idp_metadata = metadata::asserting_party_descriptor(self)?;
        let decryption = self
            .decryption_credentials
            .iter()
            .find(|c| c.is_for(CredentialUsage::Decryption))
            .ok_or_else(|| {
                RegistrationError::Credential(format!(
                    "registration '{}' has no decryption credential",
                    self.registration_id
                ))
            })?;

        ServiceProviderBuilder::default()
            .entity_id(self.entity_id.clone())
            .key(decryption.private_key().cloned())
            .certificate(Some(decryption.certificate().clone()))
            .acs_url(self.assertion_consumer_service_location.clone())
            .idp_metadata(idp_metadata)
            .authn_name_id_format(metadata::NAME_ID_FORMAT_UNSPECIFIED.to_string())
            .build()
            .map_err(|e| {
                RegistrationError::Metadata(format!("Failed to build ServiceProvider: {}", e))
            })
    }
}
