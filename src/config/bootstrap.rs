use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::saml::DEFAULT_RESOURCE_DIR;

/// Credential and realm bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Directory the realm document and PEM files are written to.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Module path (e.g. "acme.security" or "acme::security") under which a
    /// security-config source stub is generated. No stub when unset.
    #[serde(default)]
    pub config_package: Option<String>,

    /// Source root, relative to the target directory's parent, that receives
    /// the generated stub.
    #[serde(default = "default_source_root")]
    pub source_root: String,

    /// Validity of generated certificates in days.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Run the bootstrap before `serve` starts accepting requests.
    #[serde(default)]
    pub on_startup: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
            config_package: None,
            source_root: default_source_root(),
            validity_days: default_validity_days(),
            on_startup: false,
        }
    }
}

impl BootstrapConfig {
    /// Configured package name, treating blank strings as unset.
    pub fn config_package(&self) -> Option<&str> {
        self.config_package
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        if self.validity_days == 0 {
            return Err("bootstrap.validity_days must be at least 1".into());
        }
        if self.source_root.trim().is_empty() {
            return Err("bootstrap.source_root must not be empty".into());
        }
        Ok(())
    }
}

fn default_target_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESOURCE_DIR)
}

fn default_source_root() -> String {
    "src".to_string()
}

fn default_validity_days() -> u32 {
    3650 // ten years
}
