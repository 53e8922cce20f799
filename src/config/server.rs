use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on. Also used when deriving the SAML base URL.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether the application is served over TLS (typically terminated in
    /// front of it). Selects `https` when the base URL is derived.
    #[serde(default)]
    pub tls_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_enabled: false,
        }
    }
}

impl ServerConfig {
    pub fn scheme(&self) -> &'static str {
        if self.tls_enabled { "https" } else { "http" }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Settings of the embedded Keycloak server that the relying party talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeycloakConfig {
    /// Path prefix under which Keycloak is mounted (e.g. "/auth").
    /// Requests below this prefix bypass the application's authentication.
    #[serde(default = "default_context_path")]
    pub context_path: String,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            context_path: default_context_path(),
        }
    }
}

fn default_context_path() -> String {
    "/auth".to_string()
}
