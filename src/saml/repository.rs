//! Lookup of relying-party registrations by registration id.

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::OnceCell;

use super::{RegistrationError, RelyingPartyRegistration, RelyingPartyRegistrationBuilder};

/// Source of relying-party registrations.
pub trait RelyingPartyRegistrationRepository: Send + Sync {
    /// Registration with the given id, or `None` when there is no such id.
    fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> Result<Option<Arc<RelyingPartyRegistration>>, RegistrationError>;
}

/// Repository over registrations built up front.
#[derive(Debug, Default)]
pub struct InMemoryRelyingPartyRegistrationRepository {
    registrations: HashMap<String, Arc<RelyingPartyRegistration>>,
}

impl InMemoryRelyingPartyRegistrationRepository {
    pub fn new(registrations: impl IntoIterator<Item = RelyingPartyRegistration>) -> Self {
        let registrations = registrations
            .into_iter()
            .map(|r| (r.registration_id.clone(), Arc::new(r)))
            .collect();
        Self { registrations }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl RelyingPartyRegistrationRepository for InMemoryRelyingPartyRegistrationRepository {
    fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> Result<Option<Arc<RelyingPartyRegistration>>, RegistrationError> {
        Ok(self.registrations.get(registration_id).cloned())
    }
}

/// Repository that builds its single registration on first lookup.
///
/// A successful build is cached for the life of the repository. A failed
/// build is returned to the caller and retried on the next lookup.
#[derive(Debug)]
pub struct LazyRelyingPartyRegistrationRepository {
    builder: RelyingPartyRegistrationBuilder,
    registration: OnceCell<Arc<RelyingPartyRegistration>>,
}

impl LazyRelyingPartyRegistrationRepository {
    pub fn new(builder: RelyingPartyRegistrationBuilder) -> Self {
        Self {
            builder,
            registration: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.registration.get().is_some()
    }
}

impl RelyingPartyRegistrationRepository for LazyRelyingPartyRegistrationRepository {
    fn find_by_registration_id(
        &self,
        registration_id: &str,
    ) -> Result<Option<Arc<RelyingPartyRegistration>>, RegistrationError> {
        if registration_id != self.builder.registration_id() {
            return Ok(None);
        }

        self.registration
            .get_or_try_init(|| {
                tracing::debug!(registration_id, "Building relying-party registration on first use");
                self.builder.build().map(Arc::new)
            })
            .map(|registration| Some(Arc::clone(registration)))
    }
}

/// Build the repository selected by `saml.lazy`.
pub fn repository_from_builder(
    builder: RelyingPartyRegistrationBuilder,
    lazy: bool,
) -> Result<Arc<dyn RelyingPartyRegistrationRepository>, RegistrationError> {
    if lazy {
        Ok(Arc::new(LazyRelyingPartyRegistrationRepository::new(builder)))
    } else {
        let registration = builder.build()?;
        Ok(Arc::new(InMemoryRelyingPartyRegistrationRepository::new([
            registration,
        ])))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        bootstrap::RealmBootstrapper, config::PluginConfig, pki::SelfSignedCertificateFactory,
    };

    fn config_in(dir: &TempDir) -> PluginConfig {
        let mut config = PluginConfig::default();
        config.bootstrap.target_dir = dir.path().to_path_buf();
        config.saml.resource_dir = dir.path().to_path_buf();
        config.saml.base_url = Some("http://localhost:8080".to_string());
        config
    }

    fn bootstrap(config: &PluginConfig) {
        RealmBootstrapper::new(config, SelfSignedCertificateFactory::default())
            .run()
            .unwrap();
    }

    #[test]
    fn test_in_memory_lookup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        bootstrap(&config);
        let registration = RelyingPartyRegistrationBuilder::from_config(&config)
            .build()
            .unwrap();

        let repository = InMemoryRelyingPartyRegistrationRepository::new([registration]);

        assert_eq!(repository.len(), 1);
        let found = repository.find_by_registration_id("webmvc").unwrap().unwrap();
        assert_eq!(found.entity_id, "webmvc-app");
        assert!(repository.find_by_registration_id("other").unwrap().is_none());
    }

    #[test]
    fn test_lazy_builds_once_on_first_lookup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        bootstrap(&config);

        let repository = LazyRelyingPartyRegistrationRepository::new(
            RelyingPartyRegistrationBuilder::from_config(&config),
        );
        assert!(!repository.is_initialized());

        assert!(repository.find_by_registration_id("other").unwrap().is_none());
        assert!(!repository.is_initialized());

        let first = repository.find_by_registration_id("webmvc").unwrap().unwrap();
        assert!(repository.is_initialized());

        // Cached: removing the files afterwards does not matter
        fs::remove_file(dir.path().join("app_private_key.pem")).unwrap();
        let second = repository.find_by_registration_id("webmvc").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lazy_defers_errors_until_lookup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let repository = repository_from_builder(
            RelyingPartyRegistrationBuilder::from_config(&config),
            true,
        )
        .unwrap();

        let err = repository.find_by_registration_id("webmvc").unwrap_err();
        assert!(matches!(err, RegistrationError::CertificateLoad { .. }));

        // Not cached: succeeds once the files exist
        bootstrap(&config);
        assert!(repository.find_by_registration_id("webmvc").unwrap().is_some());
    }

    #[test]
    fn test_eager_fails_at_construction() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let result = repository_from_builder(
            RelyingPartyRegistrationBuilder::from_config(&config),
            false,
        );

        assert!(matches!(result, Err(RegistrationError::CertificateLoad { .. })));
    }
}
