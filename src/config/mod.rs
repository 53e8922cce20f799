//! Configuration module for the Keycloak SAML plugin.
//!
//! The plugin is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8443
//! tls_enabled = true
//!
//! [saml]
//! realm_name = "webmvc"
//! client_id = "webmvc-app"
//! base_url = "${PUBLIC_BASE_URL}"
//!
//! [bootstrap]
//! target_dir = "./resources"
//! on_startup = true
//! ```

mod auth;
mod bootstrap;
mod observability;
mod saml;
mod server;

use std::path::Path;

pub use auth::*;
pub use bootstrap::*;
pub use observability::*;
pub use saml::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Root configuration.
///
/// Every section is optional; an empty file yields realm `webmvc`, client
/// `webmvc-app` on port 8080.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedded Keycloak settings.
    #[serde(default)]
    pub keycloak: KeycloakConfig,

    /// Relying-party registration settings.
    #[serde(default)]
    pub saml: SamlConfig,

    /// Credential bootstrap settings.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Browser session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl PluginConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: PluginConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }

        // An empty or root prefix would exclude every path from authentication
        if self.keycloak.context_path.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(format!(
                "keycloak.context_path must name a path below '/', got '{}'",
                self.keycloak.context_path
            )));
        }
        if !self.keycloak.context_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "keycloak.context_path must start with '/', got '{}'",
                self.keycloak.context_path
            )));
        }

        self.saml.validate().map_err(ConfigError::Validation)?;
        self.bootstrap.validate().map_err(ConfigError::Validation)?;
        self.session.validate().map_err(ConfigError::Validation)?;

        if self.saml.resource_dir != self.bootstrap.target_dir {
            tracing::debug!(
                resource_dir = %self.saml.resource_dir.display(),
                target_dir = %self.bootstrap.target_dir.display(),
                "SAML credentials are read from a different directory than bootstrap writes to"
            );
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    static VAR_PATTERN: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| {
            regex::Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid")
        });

    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in VAR_PATTERN.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
