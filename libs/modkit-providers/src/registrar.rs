use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::authentication::AuthenticationBuilder;
use crate::config::ConfigSection;
use crate::services::ServiceCollection;

/// Category of provider. Its `Display` form is the configuration path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Authentication,
    Authorization,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderType::Authentication => "Authentication",
            ProviderType::Authorization => "Authorization",
        })
    }
}

/// One concrete configured provider (an OAuth client, an IdP tenant, ...).
pub trait AuthorizationProviderInstanceSettings: DeserializeOwned + Send + Sync {
    /// Authentication scheme this instance is registered under.
    fn scheme(&self) -> &str;

    /// Disabled instances are bound but not wired.
    fn enabled(&self) -> bool {
        true
    }
}

/// Settings bound from a provider's configuration section.
pub trait AuthorizationProviderSettings: DeserializeOwned + Send + Sync {
    type Instance: AuthorizationProviderInstanceSettings;

    /// Configured instances, in declaration order.
    fn instances(&self) -> &[Self::Instance];
}

/// Stock settings shape: just the `Instances` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", bound(deserialize = "I: DeserializeOwned"))]
pub struct ProviderSettings<I> {
    #[serde(default)]
    pub instances: Vec<I>,
}

impl<I> Default for ProviderSettings<I> {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
        }
    }
}

impl<I> AuthorizationProviderSettings for ProviderSettings<I>
where
    I: AuthorizationProviderInstanceSettings,
{
    type Instance = I;

    fn instances(&self) -> &[I] {
        &self.instances
    }
}

/// Strategy that wires one provider family into the host.
///
/// Implementations are stateless and constructed with `Default` for every
/// registration call. `register` is invoked at most once per
/// [`ServiceCollection`], and only with settings that hold at least one instance.
pub trait AuthorizationProviderRegistrar: Send + Sync {
    type Settings: AuthorizationProviderSettings;

    fn provider_type(&self) -> ProviderType;

    fn provider_name(&self) -> &'static str;

    /// Wire the provider's services and authentication schemes.
    ///
    /// # Errors
    /// Implementations fail for their own reasons (invalid instance settings,
    /// scheme collisions, ...). The error is reported with the registrar name.
    fn register(
        &self,
        services: &ServiceCollection,
        settings: &Self::Settings,
        section: &ConfigSection,
        auth: &mut AuthenticationBuilder,
    ) -> anyhow::Result<()>;
}
