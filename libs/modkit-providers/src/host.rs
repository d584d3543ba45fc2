use std::sync::Arc;

use crate::config::Configuration;
use crate::logging::DeferredLogger;
use crate::services::ServiceCollection;

/// Start-up context handed to provider registration.
///
/// Bundles:
/// - **Services**: the [`ServiceCollection`] registrars add to, and which owns
///   the registration markers.
/// - **Configuration**: the layered [`Configuration`] provider sections are read from.
/// - **Logger**: a [`DeferredLogger`] that holds entries until the host's
///   subscriber is installed.
///
/// ```ignore
/// let mut builder = HostApplicationBuilder::new(configuration);
/// let mut auth = AuthenticationBuilder::new();
/// builder
///     .register_authorization_provider::<GithubRegistrar>(&mut auth, false)?
///     .register_authorization_provider::<OidcRegistrar>(&mut auth, true)?;
/// builder.logger().mark_ready();
/// ```
#[derive(Debug, Clone)]
pub struct HostApplicationBuilder {
    services: Arc<ServiceCollection>,
    configuration: Arc<Configuration>,
    logger: DeferredLogger,
}

impl HostApplicationBuilder {
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self::with_parts(
            Arc::new(ServiceCollection::new()),
            Arc::new(configuration),
            DeferredLogger::new(),
        )
    }

    /// Build around existing parts, e.g. a service collection shared with other builders.
    #[must_use]
    pub fn with_parts(
        services: Arc<ServiceCollection>,
        configuration: Arc<Configuration>,
        logger: DeferredLogger,
    ) -> Self {
        Self {
            services,
            configuration,
            logger,
        }
    }

    #[inline]
    #[must_use]
    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    #[inline]
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    #[inline]
    #[must_use]
    pub fn logger(&self) -> &DeferredLogger {
        &self.logger
    }
}
