//! Idempotent generation of the Keycloak realm document and the PEM
//! credentials the relying-party registration is built from.
//!
//! A run never overwrites an existing file in place. Files that exist are
//! skipped with a warning; files that are missing are generated. The app
//! private key and app certificate form a pair: when only one half is
//! present it is renamed aside and both halves are rewritten from fresh
//! material.

mod error;
mod template;

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
pub use error::BootstrapError;
pub use template::{
    REALM_TEMPLATE, RealmCredentials, SECURITY_CONFIG_TEMPLATE, render_realm,
    render_security_config,
};

use crate::{
    config::{
        BootstrapConfig, DEFAULT_APP_CERTIFICATE_PEM, DEFAULT_APP_PRIVATE_KEY_PEM,
        DEFAULT_IDP_CERTIFICATE_PEM, PluginConfig,
    },
    pki::{KeyMaterial, SelfSignedCertificateFactory},
    utils::join_path,
};

pub const REALM_DOCUMENT: &str = "keycloak-realm.json";
pub const APP_PRIVATE_KEY: &str = DEFAULT_APP_PRIVATE_KEY_PEM;
pub const APP_CERTIFICATE: &str = DEFAULT_APP_CERTIFICATE_PEM;
pub const IDP_CERTIFICATE: &str = DEFAULT_IDP_CERTIFICATE_PEM;
pub const SECURITY_CONFIG_FILE: &str = "keycloak_plugin_security_config.rs";

/// Outcome of a bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Files written by this run.
    pub generated: Vec<PathBuf>,
    /// Files left untouched because they already existed.
    pub skipped: Vec<PathBuf>,
    /// Orphaned halves of the app key pair, at their new location.
    pub set_aside: Vec<PathBuf>,
}

impl BootstrapReport {
    /// True when the run changed nothing on disk.
    pub fn is_unchanged(&self) -> bool {
        self.generated.is_empty() && self.set_aside.is_empty()
    }
}

/// Generates the realm document, PEM files and optional security-config stub.
pub struct RealmBootstrapper {
    config: BootstrapConfig,
    realm_name: String,
    client_id: String,
    factory: SelfSignedCertificateFactory,
}

impl RealmBootstrapper {
    pub fn new(config: &PluginConfig, factory: SelfSignedCertificateFactory) -> Self {
        Self {
            config: config.bootstrap.clone(),
            realm_name: config.saml.realm_name.clone(),
            client_id: config.saml.client_id.clone(),
            factory,
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.config.target_dir
    }

    /// Run the bootstrap. Safe to re-run; a second run on a complete target
    /// directory performs no writes.
    pub fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let target_dir = self.target_dir();
        tracing::info!(
            target_dir = %target_dir.display(),
            realm = %self.realm_name,
            client_id = %self.client_id,
            "Bootstrapping Keycloak realm"
        );

        fs::create_dir_all(target_dir).map_err(|e| BootstrapError::io(target_dir, e))?;

        let mut report = BootstrapReport::default();

        if let Some(package) = self.config.config_package() {
            self.write_security_config(package, &mut report)?;
        }

        let realm_path = target_dir.join(REALM_DOCUMENT);
        let app_key_path = target_dir.join(APP_PRIVATE_KEY);
        let app_cert_path = target_dir.join(APP_CERTIFICATE);
        let idp_cert_path = target_dir.join(IDP_CERTIFICATE);

        let realm_exists = realm_path.exists();
        let app_key_exists = app_key_path.exists();
        let app_cert_exists = app_cert_path.exists();
        let idp_cert_exists = idp_cert_path.exists();

        let app = if !app_key_exists || !app_cert_exists || !realm_exists {
            Some(self.factory.generate(&self.client_id, self.config.validity_days)?)
        } else {
            None
        };
        let idp = if !idp_cert_exists || !realm_exists {
            Some(self.factory.generate(&self.realm_name, self.config.validity_days)?)
        } else {
            None
        };

        // Realm document
        match (&app, &idp) {
            (Some(app), Some(idp)) if !realm_exists => {
                let document = self.render_realm_document(app, idp)?;
                write_new(&realm_path, &document, &mut report)?;
            }
            _ => skip_existing(&realm_path, &mut report),
        }

        // App key pair
        if app_key_exists && app_cert_exists {
            skip_existing(&app_key_path, &mut report);
            skip_existing(&app_cert_path, &mut report);
        } else if let Some(app) = &app {
            for orphan in [&app_key_path, &app_cert_path] {
                if orphan.exists() {
                    set_aside(orphan, &mut report)?;
                }
            }
            write_new(&app_key_path, &app.private_key_pem()?, &mut report)?;
            write_new(&app_cert_path, &app.certificate_pem()?, &mut report)?;
        }

        // IdP certificate
        if idp_cert_exists {
            skip_existing(&idp_cert_path, &mut report);
        } else if let Some(idp) = &idp {
            write_new(&idp_cert_path, &idp.certificate_pem()?, &mut report)?;
        }

        if realm_exists && (app.is_some() || idp.is_some()) {
            tracing::warn!(
                path = %realm_path.display(),
                "Credentials were regenerated but the existing realm document still embeds the previous ones; \
                remove it and re-run to resynchronize"
            );
        }
        if !realm_exists && ((app_key_exists && app_cert_exists) || idp_cert_exists) {
            tracing::warn!(
                path = %realm_path.display(),
                "Realm document was generated with fresh credentials that differ from the kept PEM files; \
                remove the PEM files and re-run to resynchronize"
            );
        }

        tracing::info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            set_aside = report.set_aside.len(),
            "Bootstrap finished"
        );

        Ok(report)
    }

    /// Location of the generated security-config source for `package`.
    ///
    /// `<target_dir>/../<source_root>/<package path>/keycloak_plugin_security_config.rs`,
    /// where both `.` and `::` separate package segments.
    pub fn security_config_path(&self, package: &str) -> PathBuf {
        let package_path = package.replace("::", "/").replace('.', "/");
        let target_dir = self.target_dir().to_string_lossy();
        let dir = join_path(
            &target_dir,
            &["..", self.config.source_root.as_str(), package_path.as_str()],
        );
        PathBuf::from(join_path(&dir, &[SECURITY_CONFIG_FILE]))
    }

    fn write_security_config(
        &self,
        package: &str,
        report: &mut BootstrapReport,
    ) -> Result<(), BootstrapError> {
        let path = self.security_config_path(package);
        if path.exists() {
            skip_existing(&path, report);
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BootstrapError::io(parent, e))?;
        }

        let source = render_security_config(SECURITY_CONFIG_TEMPLATE, package);
        write_new(&path, &source, report)
    }

    fn render_realm_document(
        &self,
        app: &KeyMaterial,
        idp: &KeyMaterial,
    ) -> Result<String, BootstrapError> {
        let app_private_key = app.private_key_base64()?;
        let app_certificate = app.certificate_base64()?;
        let idp_private_key = idp.private_key_base64()?;
        let idp_certificate = idp.certificate_base64()?;

        render_realm(
            REALM_TEMPLATE,
            &self.realm_name,
            &self.client_id,
            RealmCredentials {
                app_private_key: &app_private_key,
                app_certificate: &app_certificate,
                idp_private_key: &idp_private_key,
                idp_certificate: &idp_certificate,
            },
        )
    }
}

fn skip_existing(path: &Path, report: &mut BootstrapReport) {
    tracing::warn!(path = %path.display(), "Skipping generation: file already exists");
    report.skipped.push(path.to_path_buf());
}

/// Write `contents` to a file that must not exist yet.
fn write_new(path: &Path, contents: &str, report: &mut BootstrapReport) -> Result<(), BootstrapError> {
    tracing::info!(path = %path.display(), "Generating");

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| BootstrapError::io(path, e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| BootstrapError::io(path, e))?;

    report.generated.push(path.to_path_buf());
    Ok(())
}

/// Rename an orphaned file to `<name>.orphaned-<unix-seconds>`.
fn set_aside(path: &Path, report: &mut BootstrapReport) -> Result<(), BootstrapError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Utc::now().timestamp();

    let mut destination = path.with_file_name(format!("{name}.orphaned-{stamp}"));
    let mut attempt = 1;
    while destination.exists() {
        destination = path.with_file_name(format!("{name}.orphaned-{stamp}-{attempt}"));
        attempt += 1;
    }

    fs::rename(path, &destination).map_err(|e| BootstrapError::io(path, e))?;
    tracing::warn!(
        path = %path.display(),
        moved_to = %destination.display(),
        "Set aside orphaned half of the app key pair"
    );

    report.set_aside.push(destination);
    Ok(())
}
