//! SAML 2.0 metadata documents derived from a registration.

use samael::metadata::EntityDescriptor;

use super::{RegistrationError, RelyingPartyRegistration, Saml2X509Credential};

pub const NAME_ID_FORMAT_UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";
const BINDING_HTTP_POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";
const BINDING_HTTP_REDIRECT: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";

/// Generate SP metadata XML for IdP auto-configuration.
///
/// The document includes:
/// - SP entity ID
/// - Signing and encryption key descriptors (the app certificate)
/// - Single Logout Service with HTTP-Redirect binding
/// - Assertion Consumer Service with HTTP-POST binding
pub fn service_provider_metadata(
    registration: &RelyingPartyRegistration,
) -> Result<String, RegistrationError> {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
  <md:SPSSODescriptor AuthnRequestsSigned="{}" WantAssertionsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">"#,
        escape_attr(&registration.entity_id),
        !registration.signing_credentials.is_empty(),
    );

    for credential in &registration.signing_credentials {
        xml.push_str(&key_descriptor("signing", credential, "    ")?);
    }
    for credential in &registration.decryption_credentials {
        xml.push_str(&key_descriptor("encryption", credential, "    ")?);
    }

    xml.push_str(&format!(
        r#"
    <md:SingleLogoutService Binding="{}" Location="{}"/>
    <md:NameIDFormat>{}</md:NameIDFormat>
    <md:AssertionConsumerService Binding="{}" Location="{}" index="1"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#,
        BINDING_HTTP_REDIRECT,
        escape_attr(&registration.single_logout_service_location),
        NAME_ID_FORMAT_UNSPECIFIED,
        BINDING_HTTP_POST,
        escape_attr(&registration.assertion_consumer_service_location),
    ));

    Ok(xml)
}

/// Build an `EntityDescriptor` for the asserting party from the registration.
pub fn asserting_party_descriptor(
    registration: &RelyingPartyRegistration,
) -> Result<EntityDescriptor, RegistrationError> {
    let party = &registration.asserting_party;

    let mut key_descriptors = String::new();
    for credential in &party.verification_credentials {
        key_descriptors.push_str(&key_descriptor("signing", credential, "    ")?);
    }
    for credential in &party.encryption_credentials {
        key_descriptors.push_str(&key_descriptor("encryption", credential, "    ")?);
    }

    let xml = format!(
        r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
  <md:IDPSSODescriptor WantAuthnRequestsSigned="{}" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">{}
    <md:SingleLogoutService Binding="{}" Location="{}"/>
    <md:SingleSignOnService Binding="{}" Location="{}"/>
  </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        escape_attr(&party.entity_id),
        party.want_authn_requests_signed,
        key_descriptors,
        BINDING_HTTP_REDIRECT,
        escape_attr(&party.single_logout_service_location),
        BINDING_HTTP_REDIRECT,
        escape_attr(&party.single_sign_on_service_location),
    );

    samael::metadata::de::from_str(&xml).map_err(|e| {
        tracing::error!(error = %e, "Failed to build asserting party metadata");
        RegistrationError::Metadata(format!("Failed to build IdP metadata: {}", e))
    })
}

fn key_descriptor(
    key_use: &str,
    credential: &Saml2X509Credential,
    indent: &str,
) -> Result<String, RegistrationError> {
    Ok(format!(
        r#"
{indent}<md:KeyDescriptor use="{key_use}">
{indent}  <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
{indent}    <ds:X509Data>
{indent}      <ds:X509Certificate>{}</ds:X509Certificate>
{indent}    </ds:X509Data>
{indent}  </ds:KeyInfo>
{indent}</md:KeyDescriptor>"#,
        credential.certificate_base64()?
    ))
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
