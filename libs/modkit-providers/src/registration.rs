//! Configuration-driven provider registration.
//!
//! For a registrar type `R` the flow is:
//! 1. Skip if `R` was already processed by this service collection; otherwise
//!    mark it before any fallible work.
//! 2. Read `Cirreum:<ProviderType>:Providers:<ProviderName>`. A missing section
//!    is an error only when the caller asks for it with `required`.
//! 3. Bind the section to `R::Settings`; a shape mismatch is always an error.
//! 4. Skip with a warning when there are no instances.
//! 5. Hand everything to `R::register`.
//!
//! Because the marker is written first, a call that fails in steps 2-5 still
//! leaves `R` marked, and later calls for `R` on the same collection no-op.

use crate::authentication::AuthenticationBuilder;
use crate::error::RegistrationError;
use crate::host::HostApplicationBuilder;
use crate::registrar::{AuthorizationProviderRegistrar, AuthorizationProviderSettings, ProviderType};

/// Root namespace of provider configuration.
pub const CONFIG_ROOT: &str = "Cirreum";

/// Configuration path for a provider: `Cirreum:<ProviderType>:Providers:<ProviderName>`.
#[must_use]
pub fn provider_config_path(provider_type: ProviderType, provider_name: &str) -> String {
    format!("{CONFIG_ROOT}:{provider_type}:Providers:{provider_name}")
}

/// Unqualified type name, used to label log entries and errors.
fn registrar_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Registration of authorization providers on a host builder.
pub trait AuthorizationProviderExt {
    /// Register the provider family handled by `R`.
    ///
    /// Returns the builder for chaining. Repeated calls for the same `R` are no-ops.
    ///
    /// # Errors
    /// - `RegistrationError::ConfigurationMissing` if `required` is set and the
    ///   provider section does not exist.
    /// - `RegistrationError::ConfigurationInvalid` if the section exists but
    ///   cannot be bound to `R::Settings`.
    /// - `RegistrationError::Registrar` if `R::register` fails.
    fn register_authorization_provider<R>(
        &mut self,
        auth: &mut AuthenticationBuilder,
        required: bool,
    ) -> Result<&mut Self, RegistrationError>
    where
        R: AuthorizationProviderRegistrar + Default + 'static;
}

impl AuthorizationProviderExt for HostApplicationBuilder {
    fn register_authorization_provider<R>(
        &mut self,
        auth: &mut AuthenticationBuilder,
        required: bool,
    ) -> Result<&mut Self, RegistrationError>
    where
        R: AuthorizationProviderRegistrar + Default + 'static,
    {
        let name = registrar_name::<R>();
        let log = self.logger().begin_scope(name);

        if !self.services().mark_type_as_registered::<R>() {
            log.debug(format!("Duplicate request for {name} and will be skipped."));
            return Ok(self);
        }

        let registrar = R::default();
        let path = provider_config_path(registrar.provider_type(), registrar.provider_name());
        let section = self.configuration().get_section(&path);

        if !section.exists() {
            if required {
                return Err(RegistrationError::ConfigurationMissing {
                    registrar: name.to_owned(),
                    path,
                });
            }
            log.debug(format!(
                "Skipping '{name}' - no configuration found at '{path}'."
            ));
            return Ok(self);
        }

        let settings: R::Settings =
            section
                .bind()
                .map_err(|source| RegistrationError::ConfigurationInvalid {
                    registrar: name.to_owned(),
                    path: path.clone(),
                    source,
                })?;

        let instance_count = settings.instances().len();
        if instance_count == 0 {
            log.warn(format!("No instances found to register for {name}."));
            return Ok(self);
        }

        registrar
            .register(self.services(), &settings, &section, auth)
            .map_err(|source| RegistrationError::Registrar {
                registrar: name.to_owned(),
                source,
            })?;

        log.debug(format!(
            "Registered {instance_count} provider instances for {name} of type {}.",
            registrar.provider_type()
        ));

        Ok(self)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{ConfigSection, Configuration};
    use crate::logging::{DeferredLogger, LogLevel};
    use crate::registrar::{AuthorizationProviderInstanceSettings, ProviderSettings};
    use crate::services::ServiceCollection;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use tracing_test::traced_test;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SampleInstance {
        scheme: String,
    }

    impl AuthorizationProviderInstanceSettings for SampleInstance {
        fn scheme(&self) -> &str {
            &self.scheme
        }
    }

    #[derive(Default)]
    struct SampleRegistrar;

    impl AuthorizationProviderRegistrar for SampleRegistrar {
        type Settings = ProviderSettings<SampleInstance>;

        fn provider_type(&self) -> ProviderType {
            ProviderType::Authentication
        }

        fn provider_name(&self) -> &'static str {
            "Sample"
        }

        fn register(
            &self,
            _services: &ServiceCollection,
            _settings: &Self::Settings,
            _section: &ConfigSection,
            _auth: &mut AuthenticationBuilder,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn builder(config: serde_json::Value, logger: DeferredLogger) -> HostApplicationBuilder {
        HostApplicationBuilder::with_parts(
            Arc::new(ServiceCollection::new()),
            Arc::new(Configuration::from_value(config)),
            logger,
        )
    }

    #[test]
    fn config_path_uses_fixed_template() {
        assert_eq!(
            provider_config_path(ProviderType::Authentication, "Foo"),
            "Cirreum:Authentication:Providers:Foo"
        );
    }

    #[test]
    fn registrar_name_strips_module_path_and_generics() {
        assert_eq!(registrar_name::<SampleRegistrar>(), "SampleRegistrar");
        assert_eq!(
            registrar_name::<ProviderSettings<SampleInstance>>(),
            "ProviderSettings"
        );
    }

    #[test]
    fn log_entries_are_scoped_to_registrar_and_ordered() {
        let logger = DeferredLogger::new();
        let mut host = builder(json!({}), logger.clone());
        let mut auth = AuthenticationBuilder::new();

        host.register_authorization_provider::<SampleRegistrar>(&mut auth, false)
            .unwrap()
            .register_authorization_provider::<SampleRegistrar>(&mut auth, false)
            .unwrap();

        let pending = logger.pending();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|e| &*e.scope == "SampleRegistrar"));
        assert!(pending.iter().all(|e| e.level == LogLevel::Debug));
        assert!(pending[0].message.starts_with("Skipping 'SampleRegistrar'"));
        assert!(pending[0].message.contains("Cirreum:Authentication:Providers:Sample"));
        assert!(pending[1].message.starts_with("Duplicate request"));
    }

    #[test]
    fn empty_instances_log_a_warning() {
        let logger = DeferredLogger::new();
        let mut host = builder(
            json!({ "Cirreum": { "Authentication": { "Providers": { "Sample": { "Instances": [], "Note": "x" } } } } }),
            logger.clone(),
        );
        let mut auth = AuthenticationBuilder::new();

        host.register_authorization_provider::<SampleRegistrar>(&mut auth, true)
            .unwrap();

        let pending = logger.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].level, LogLevel::Warn);
        assert_eq!(
            pending[0].message,
            "No instances found to register for SampleRegistrar."
        );
    }

    #[test]
    #[traced_test]
    fn success_is_logged_with_count_and_type() {
        let mut host = builder(
            json!({ "Cirreum": { "Authentication": { "Providers": { "Sample": {
                "Instances": [ { "Scheme": "a" }, { "Scheme": "b" } ]
            } } } } }),
            DeferredLogger::ready(),
        );
        let mut auth = AuthenticationBuilder::new();

        host.register_authorization_provider::<SampleRegistrar>(&mut auth, false)
            .unwrap();

        assert!(logs_contain(
            "Registered 2 provider instances for SampleRegistrar of type Authentication."
        ));
    }
}
