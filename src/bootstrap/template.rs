//! Embedded templates for the realm document and the security-config stub.

use super::BootstrapError;

/// Keycloak realm import document.
///
/// Contains four positional `%s` placeholders, filled in order with the app
/// private key, the app certificate, the IdP private key and the IdP
/// certificate (all unframed Base64), plus the named tokens `${realmName}`
/// and `${clientId}`.
pub const REALM_TEMPLATE: &str = include_str!("../../templates/realm-template.json");

/// Body of the generated security-config source file.
pub const SECURITY_CONFIG_TEMPLATE: &str = include_str!("../../templates/security_config.rs.tmpl");

const PLACEHOLDER: &str = "%s";
const REALM_NAME_TOKEN: &str = "${realmName}";
const CLIENT_ID_TOKEN: &str = "${clientId}";

/// Credentials substituted into the realm template, in placeholder order.
#[derive(Debug, Clone, Copy)]
pub struct RealmCredentials<'a> {
    pub app_private_key: &'a str,
    pub app_certificate: &'a str,
    pub idp_private_key: &'a str,
    pub idp_certificate: &'a str,
}

/// Fill the positional placeholders, then the named tokens.
///
/// Names are JSON-string escaped so that the document stays valid for any
/// realm name or client id.
pub fn render_realm(
    template: &str,
    realm_name: &str,
    client_id: &str,
    credentials: RealmCredentials<'_>,
) -> Result<String, BootstrapError> {
    let values = [
        credentials.app_private_key,
        credentials.app_certificate,
        credentials.idp_private_key,
        credentials.idp_certificate,
    ];

    let parts: Vec<&str> = template.split(PLACEHOLDER).collect();
    if parts.len() != values.len() + 1 {
        return Err(BootstrapError::Template(format!(
            "realm template must contain exactly {} '{PLACEHOLDER}' placeholders, found {}",
            values.len(),
            parts.len() - 1
        )));
    }

    let mut rendered = String::with_capacity(
        template.len() + values.iter().map(|v| v.len()).sum::<usize>(),
    );
    for (part, value) in parts.iter().zip(values.iter()) {
        rendered.push_str(part);
        rendered.push_str(value);
    }
    if let Some(last) = parts.last() {
        rendered.push_str(last);
    }

    Ok(rendered
        .replace(REALM_NAME_TOKEN, &json_escape(realm_name))
        .replace(CLIENT_ID_TOKEN, &json_escape(client_id)))
}

/// Prepend a module header naming the package to the stub template.
pub fn render_security_config(template: &str, package: &str) -> String {
    format!("//! Keycloak SAML2 security configuration for `{package}`.\n{template}")
}

fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
