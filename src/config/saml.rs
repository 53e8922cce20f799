use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_REALM_NAME: &str = "webmvc";
pub const DEFAULT_CLIENT_ID: &str = "webmvc-app";
pub const DEFAULT_RESOURCE_DIR: &str = "./resources";
pub const DEFAULT_IDP_CERTIFICATE_PEM: &str = "keycloak_certificate.pem";
pub const DEFAULT_APP_CERTIFICATE_PEM: &str = "app_certificate.pem";
pub const DEFAULT_APP_PRIVATE_KEY_PEM: &str = "app_private_key.pem";

/// SAML relying-party configuration.
///
/// The realm name doubles as the registration id, and the client id is the
/// service provider's entity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamlConfig {
    /// Public base URL of the application (e.g. "https://app.example.com").
    /// When blank, it is derived from the server scheme, the loopback
    /// hostname and the server port.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Keycloak realm name.
    #[serde(default = "default_realm_name")]
    pub realm_name: String,

    /// SAML client id registered in the realm.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Directory that relative PEM locations are resolved against.
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,

    /// Location of the Keycloak (IdP) certificate.
    #[serde(default = "default_idp_certificate_pem")]
    pub idp_certificate_pem: PathBuf,

    /// Location of the application certificate.
    #[serde(default = "default_app_certificate_pem")]
    pub app_certificate_pem: PathBuf,

    /// Location of the application PKCS#8 private key.
    #[serde(default = "default_app_private_key_pem")]
    pub app_private_key_pem: PathBuf,

    /// Defer building the relying-party registration until first use.
    #[serde(default = "default_true")]
    pub lazy: bool,
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            realm_name: default_realm_name(),
            client_id: default_client_id(),
            resource_dir: default_resource_dir(),
            idp_certificate_pem: default_idp_certificate_pem(),
            app_certificate_pem: default_app_certificate_pem(),
            app_private_key_pem: default_app_private_key_pem(),
            lazy: true,
        }
    }
}

impl SamlConfig {
    /// Configured base URL, treating blank strings as unset.
    pub fn explicit_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn idp_certificate_path(&self) -> PathBuf {
        self.resolve(&self.idp_certificate_pem)
    }

    pub fn app_certificate_path(&self) -> PathBuf {
        self.resolve(&self.app_certificate_pem)
    }

    pub fn app_private_key_path(&self) -> PathBuf {
        self.resolve(&self.app_private_key_pem)
    }

    fn resolve(&self, location: &Path) -> PathBuf {
        if location.is_absolute() {
            location.to_path_buf()
        } else {
            self.resource_dir.join(location)
        }
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        if self.realm_name.trim().is_empty() {
            return Err("saml.realm_name must not be empty".into());
        }
        if self.client_id.trim().is_empty() {
            return Err("saml.client_id must not be empty".into());
        }
        if let Some(base_url) = self.explicit_base_url() {
            let parsed = url::Url::parse(base_url)
                .map_err(|e| format!("saml.base_url is not a valid URL: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "saml.base_url must use http or https, got '{}'",
                    parsed.scheme()
                ));
            }
        }
        Ok(())
    }
}

fn default_realm_name() -> String {
    DEFAULT_REALM_NAME.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_resource_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESOURCE_DIR)
}

fn default_idp_certificate_pem() -> PathBuf {
    PathBuf::from(DEFAULT_IDP_CERTIFICATE_PEM)
}

fn default_app_certificate_pem() -> PathBuf {
    PathBuf::from(DEFAULT_APP_CERTIFICATE_PEM)
}

fn default_app_private_key_pem() -> PathBuf {
    PathBuf::from(DEFAULT_APP_PRIVATE_KEY_PEM)
}

fn default_true() -> bool {
    true
}
