#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Configuration-driven registration of authorization providers.
//!
//! A provider family (GitHub OAuth, an OIDC issuer, ...) is wired by an
//! [`AuthorizationProviderRegistrar`]. The host calls
//! [`AuthorizationProviderExt::register_authorization_provider`] once per
//! family; the call reads `Cirreum:<ProviderType>:Providers:<ProviderName>`,
//! binds it, and hands the settings to the registrar at most once per
//! [`ServiceCollection`].

pub mod authentication;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod providers;
pub mod registrar;
pub mod registration;
pub mod services;

pub use authentication::{
    AuthenticationBuilder, AuthenticationError, AuthenticationScheme, SchemeHandler,
};
pub use config::{ConfigError, ConfigSection, Configuration, ConfigurationBuilder};
pub use error::RegistrationError;
pub use host::HostApplicationBuilder;
pub use logging::{DeferredLogger, LogEntry, LogLevel, LogScope};
pub use registrar::{
    AuthorizationProviderInstanceSettings, AuthorizationProviderRegistrar,
    AuthorizationProviderSettings, ProviderSettings, ProviderType,
};
pub use registration::{AuthorizationProviderExt, CONFIG_ROOT, provider_config_path};
pub use services::{ServiceCollection, ServiceError};
