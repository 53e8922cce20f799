//! SAML2 login, logout and metadata endpoints.
//!
//! - `GET /saml2/authenticate/{registrationId}` - signed AuthnRequest via HTTP-Redirect
//! - `POST /login/saml2/sso/{registrationId}` - Assertion Consumer Service (HTTP-POST)
//! - `POST /logout` - SP-initiated Single Logout
//! - `GET|POST /logout/saml2/slo` - IdP logout replies
//! - `GET /saml2/service-provider-metadata/{registrationId}` - SP metadata

use std::{collections::HashMap, sync::Arc};

use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use http::header;
use openssl::pkey::{PKey, Private};
use serde::Deserialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::{PendingAuthentication, SamlSession, SecurityError, SessionStore};
pub use crate::saml::SLO_PATH;
use crate::saml::{
    RelyingPartyRegistration, RelyingPartyRegistrationRepository,
    metadata::NAME_ID_FORMAT_UNSPECIFIED,
};

pub const AUTHENTICATE_PATH: &str = "/saml2/authenticate/{registration_id}";
pub const ACS_PATH: &str = "/login/saml2/sso/{registration_id}";
pub const LOGOUT_PATH: &str = "/logout";
pub const METADATA_PATH: &str = "/saml2/service-provider-metadata/{registration_id}";

const METADATA_CONTENT_TYPE: &str = "application/samlmetadata+xml";
const SIG_ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Shared state of the SAML endpoints and the authentication guard.
#[derive(Clone)]
pub struct SecurityState {
    pub repository: Arc<dyn RelyingPartyRegistrationRepository>,
    pub registration_id: String,
    pub sessions: Arc<SessionStore>,
}

impl SecurityState {
    fn registration(
        &self,
        registration_id: &str,
    ) -> Result<Arc<RelyingPartyRegistration>, SecurityError> {
        self.repository
            .find_by_registration_id(registration_id)?
            .ok_or_else(|| SecurityError::RegistrationNotFound(registration_id.to_string()))
    }

    /// Path that starts the SAML login for the default registration.
    pub fn login_path(&self) -> String {
        AUTHENTICATE_PATH.replace("{registration_id}", &self.registration_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters for the login endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Relative URL to return to after successful login
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Form data from the IdP (HTTP-POST binding).
#[derive(Debug, Deserialize)]
pub struct AcsForm {
    /// Base64-encoded SAML Response
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
    /// RelayState we sent with the AuthnRequest
    #[serde(rename = "RelayState", default)]
    pub relay_state: Option<String>,
}

/// Logout messages sent by the IdP to the SP SLO endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SloParams {
    #[serde(rename = "SAMLResponse", default)]
    pub saml_response: Option<String>,
    #[serde(rename = "SAMLRequest", default)]
    pub saml_request: Option<String>,
    #[serde(rename = "RelayState", default)]
    pub relay_state: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// SAML login - generates an AuthnRequest and redirects to the IdP.
#[tracing::instrument(name = "saml.authenticate", skip(state))]
pub async fn authenticate(
    State(state): State<SecurityState>,
    Path(registration_id): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, SecurityError> {
    let registration = state.registration(&registration_id)?;
    let sp = registration.service_provider()?;

    let sso_url = &registration.asserting_party.single_sign_on_service_location;
    let authn_request = sp
        .make_authentication_request(sso_url)
        .map_err(|e| SecurityError::Internal(format!("Failed to create AuthnRequest: {}", e)))?;

    let relay_state = Uuid::new_v4().to_string();
    let request_id = authn_request.id.clone();

    let url = if registration.asserting_party.want_authn_requests_signed {
        let private_key = registration.signing_key()?.clone();
        authn_request
            .signed_redirect(&relay_state, private_key)
            .map_err(|e| SecurityError::Internal(format!("Failed to sign AuthnRequest: {}", e)))?
            .ok_or_else(|| SecurityError::Internal("AuthnRequest has no destination".to_string()))?
    } else {
        authn_request
            .redirect(&relay_state)
            .map_err(|e| SecurityError::Internal(format!("Failed to encode AuthnRequest: {}", e)))?
            .ok_or_else(|| SecurityError::Internal("AuthnRequest has no destination".to_string()))?
    };

    state.sessions.store_pending(PendingAuthentication {
        relay_state,
        request_id,
        registration_id: registration.registration_id.clone(),
        return_to: query.return_to.filter(|url| is_local_path(url)),
        created_at: Utc::now(),
    });

    tracing::info!(
        registration_id = %registration.registration_id,
        sso_url = %sso_url,
        "Initiating SAML SSO login"
    );

    Ok(Redirect::to(url.as_str()))
}

/// Assertion Consumer Service - validates the SAML Response and creates a session.
#[tracing::instrument(name = "saml.acs", skip(state, cookies, form))]
pub async fn assertion_consumer(
    State(state): State<SecurityState>,
    Path(registration_id): Path<String>,
    cookies: Cookies,
    Form(form): Form<AcsForm>,
) -> Result<Response, SecurityError> {
    let relay_state = form
        .relay_state
        .as_deref()
        .ok_or_else(|| SecurityError::InvalidResponse("missing RelayState".to_string()))?;
    let pending = state.sessions.take_pending(relay_state).ok_or_else(|| {
        SecurityError::InvalidResponse("unknown or expired RelayState".to_string())
    })?;
    if pending.registration_id != registration_id {
        return Err(SecurityError::InvalidResponse(format!(
            "response for '{}' received on '{}'",
            pending.registration_id, registration_id
        )));
    }

    let registration = state.registration(&registration_id)?;
    let sp = registration.service_provider()?;

    let possible_request_ids = vec![pending.request_id.as_str()];
    let assertion = sp
        .parse_base64_response(&form.saml_response, Some(&possible_request_ids))
        .map_err(|e| {
            SecurityError::InvalidResponse(format!("SAML response validation failed: {}", e))
        })?;

    let name_id = assertion
        .subject
        .as_ref()
        .and_then(|s| s.name_id.as_ref())
        .map(|n| n.value.clone())
        .ok_or_else(|| SecurityError::InvalidResponse("assertion has no NameID".to_string()))?;

    let session_index = assertion
        .authn_statements
        .as_ref()
        .and_then(|stmts| stmts.first())
        .and_then(|stmt| stmt.session_index.clone());

    let session = state.sessions.create(
        &registration_id,
        name_id,
        session_index,
        collect_attributes(&assertion),
    );
    cookies.add(state.sessions.session_cookie(&session));

    tracing::info!(
        session_id = %session.id,
        name_id = %session.name_id,
        registration_id = %registration_id,
        "SAML session created"
    );

    let redirect_to = pending.return_to.unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&redirect_to).into_response())
}

/// SP-initiated logout.
///
/// Clears the local session and, when there was one, redirects the browser to
/// the IdP's SLO endpoint with a signed LogoutRequest.
#[tracing::instrument(name = "saml.logout", skip(state, cookies))]
pub async fn logout(
    State(state): State<SecurityState>,
    cookies: Cookies,
) -> Result<Redirect, SecurityError> {
    let session = state.sessions.session_from_cookies(&cookies);
    cookies.remove(state.sessions.removal_cookie());

    let Some(session) = session else {
        return Ok(Redirect::to("/"));
    };
    state.sessions.remove(session.id);

    let registration = state.registration(&session.registration_id)?;
    let relay_state = Uuid::new_v4().to_string();
    let url = logout_request_url(&registration, &session, &relay_state)?;

    tracing::info!(
        session_id = %session.id,
        name_id = %session.name_id,
        "Redirecting to IdP single logout"
    );

    Ok(Redirect::to(&url))
}

/// IdP logout reply over HTTP-Redirect.
#[tracing::instrument(name = "saml.slo", skip(state, cookies, params))]
pub async fn single_logout_redirect(
    State(state): State<SecurityState>,
    cookies: Cookies,
    Query(params): Query<SloParams>,
) -> Redirect {
    complete_logout(&state, &cookies, &params)
}

/// IdP logout reply over HTTP-POST.
#[tracing::instrument(name = "saml.slo", skip(state, cookies, params))]
pub async fn single_logout_post(
    State(state): State<SecurityState>,
    cookies: Cookies,
    Form(params): Form<SloParams>,
) -> Redirect {
    complete_logout(&state, &cookies, &params)
}

/// SP metadata for IdP auto-configuration. Reachable without a session.
#[tracing::instrument(name = "saml.metadata", skip(state))]
pub async fn metadata(
    State(state): State<SecurityState>,
    Path(registration_id): Path<String>,
) -> Result<Response, SecurityError> {
    let registration = state.registration(&registration_id)?;
    let xml = registration.service_provider_metadata()?;
    let disposition = format!(
        "attachment; filename=\"saml-{}-metadata.xml\"",
        registration.registration_id
    );

    Ok((
        [
            (header::CONTENT_TYPE, METADATA_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        xml,
    )
        .into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn complete_logout(state: &SecurityState, cookies: &Cookies, params: &SloParams) -> Redirect {
    if let Some(session) = state.sessions.session_from_cookies(cookies) {
        state.sessions.remove(session.id);
    }
    cookies.remove(state.sessions.removal_cookie());

    let kind = match (&params.saml_response, &params.saml_request) {
        (Some(_), _) => "LogoutResponse",
        (None, Some(_)) => "LogoutRequest",
        (None, None) => "none",
    };
    tracing::info!(message_type = kind, relay_state = ?params.relay_state, "SAML logout completed");

    Redirect::to("/")
}

fn collect_attributes(assertion: &samael::schema::Assertion) -> HashMap<String, Vec<String>> {
    let mut attributes: HashMap<String, Vec<String>> = HashMap::new();
    let Some(statements) = assertion.attribute_statements.as_ref() else {
        return attributes;
    };

    for statement in statements {
        for attr in &statement.attributes {
            let Some(name) = attr.name.clone().or_else(|| attr.friendly_name.clone()) else {
                continue;
            };
            attributes
                .entry(name)
                .or_default()
                .extend(attr.values.iter().filter_map(|v| v.value.clone()));
        }
    }

    attributes
}

/// Only same-origin absolute paths. Browsers read `\` as `/`, so any
/// backslash is rejected along with protocol-relative `//host`.
fn is_local_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && !url.chars().any(char::is_control)
}

/// Build the IdP SLO redirect URL carrying a signed, deflated LogoutRequest.
pub fn logout_request_url(
    registration: &RelyingPartyRegistration,
    session: &SamlSession,
    relay_state: &str,
) -> Result<String, SecurityError> {
    use std::io::Write;

    use flate2::{Compression, write::DeflateEncoder};
    use samael::traits::ToXml;

    let destination = &registration.asserting_party.single_logout_service_location;
    let logout_request = build_logout_request(registration, session, destination);

    let xml = logout_request.to_string().map_err(|e| {
        SecurityError::Internal(format!("Failed to serialize LogoutRequest: {:?}", e))
    })?;

    let mut compressed_buf = vec![];
    {
        let mut encoder = DeflateEncoder::new(&mut compressed_buf, Compression::default());
        encoder.write_all(xml.as_bytes()).map_err(|e| {
            SecurityError::Internal(format!("Failed to compress LogoutRequest: {}", e))
        })?;
    }

    let mut url: url::Url = destination
        .parse()
        .map_err(|e| SecurityError::Internal(format!("Failed to parse IdP SLO URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("SAMLRequest", &STANDARD.encode(&compressed_buf));
    if !relay_state.is_empty() {
        url.query_pairs_mut().append_pair("RelayState", relay_state);
    }

    let url = sign_redirect_url(url, registration.signing_key()?)?;
    Ok(url.to_string())
}

fn build_logout_request(
    registration: &RelyingPartyRegistration,
    session: &SamlSession,
    destination: &str,
) -> samael::schema::LogoutRequest {
    use samael::schema::{Issuer, LogoutRequest, NameID};

    LogoutRequest {
        id: Some(format!("_logout_{}", Uuid::new_v4())),
        version: Some("2.0".to_string()),
        issue_instant: Some(Utc::now()),
        destination: Some(destination.to_string()),
        issuer: Some(Issuer {
            value: Some(registration.entity_id.clone()),
            ..Default::default()
        }),
        name_id: Some(NameID {
            value: session.name_id.clone(),
            format: Some(NAME_ID_FORMAT_UNSPECIFIED.to_string()),
        }),
        session_index: session.session_index.clone(),
        signature: None,
    }
}

/// Sign a redirect URL for the SAML HTTP-Redirect binding.
///
/// The signature covers `SAMLRequest=..&RelayState=..&SigAlg=..` exactly as
/// encoded in the query string.
fn sign_redirect_url(
    mut url: url::Url,
    private_key: &PKey<Private>,
) -> Result<url::Url, SecurityError> {
    use openssl::{hash::MessageDigest, sign::Signer};

    url.query_pairs_mut().append_pair("SigAlg", SIG_ALG_RSA_SHA256);

    let query_string = url
        .query()
        .ok_or_else(|| SecurityError::Internal("No query string to sign".to_string()))?;

    let mut signer = Signer::new(MessageDigest::sha256(), private_key)
        .map_err(|e| SecurityError::Internal(format!("Failed to create signer: {}", e)))?;
    signer
        .update(query_string.as_bytes())
        .map_err(|e| SecurityError::Internal(format!("Failed to update signer: {}", e)))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| SecurityError::Internal(format!("Failed to sign: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("Signature", &STANDARD.encode(&signature));

    Ok(url)
}
