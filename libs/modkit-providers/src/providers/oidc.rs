//! Generic OpenID Connect identity provider (JWT bearer).
//!
//! Handles any OIDC-compliant issuer that publishes discovery metadata under
//! `<Authority>/.well-known/openid-configuration`.

use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Deserialize;
use url::Url;

use super::{apply_default_scheme, default_true};
use crate::authentication::{AuthenticationBuilder, SchemeHandler};
use crate::config::ConfigSection;
use crate::registrar::{
    AuthorizationProviderInstanceSettings, AuthorizationProviderRegistrar, ProviderSettings,
    ProviderType,
};
use crate::services::ServiceCollection;

const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OidcInstanceSettings {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Issuer base URL.
    pub authority: Url,

    pub client_id: String,

    /// Expected `aud`; falls back to `ClientId`.
    #[serde(default)]
    pub audience: Option<String>,

    #[serde(default = "default_true")]
    pub require_https_metadata: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_scheme() -> String {
    "Bearer".to_owned()
}

impl AuthorizationProviderInstanceSettings for OidcInstanceSettings {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Resolved options for one OIDC scheme, registered keyed by scheme name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcOptions {
    pub scheme: String,
    pub authority: Url,
    pub client_id: String,
    pub audience: String,
    pub metadata_address: Url,
}

impl OidcOptions {
    /// # Errors
    /// Fails on an empty `ClientId`, or a non-HTTPS authority while
    /// `RequireHttpsMetadata` is set.
    pub fn from_instance(instance: &OidcInstanceSettings) -> anyhow::Result<Self> {
        if instance.client_id.trim().is_empty() {
            bail!("instance '{}' has an empty ClientId", instance.scheme);
        }
        if instance.require_https_metadata && instance.authority.scheme() != "https" {
            bail!(
                "instance '{}' authority '{}' must use https when RequireHttpsMetadata is set",
                instance.scheme,
                instance.authority
            );
        }

        let mut base = instance.authority.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            scheme: instance.scheme.clone(),
            authority: instance.authority.clone(),
            client_id: instance.client_id.clone(),
            audience: instance
                .audience
                .clone()
                .unwrap_or_else(|| instance.client_id.clone()),
            metadata_address: base.join(DISCOVERY_PATH)?,
        })
    }
}

/// Registrar for `Cirreum:Authentication:Providers:Oidc`.
#[derive(Debug, Default)]
pub struct OidcRegistrar;

impl AuthorizationProviderRegistrar for OidcRegistrar {
    type Settings = ProviderSettings<OidcInstanceSettings>;

    fn provider_type(&self) -> ProviderType {
        ProviderType::Authentication
    }

    fn provider_name(&self) -> &'static str {
        "Oidc"
    }

    fn register(
        &self,
        services: &ServiceCollection,
        settings: &Self::Settings,
        section: &ConfigSection,
        auth: &mut AuthenticationBuilder,
    ) -> anyhow::Result<()> {
        for instance in settings.instances.iter().filter(|i| i.enabled) {
            let options = OidcOptions::from_instance(instance)?;
            auth.add_scheme(
                instance.scheme.clone(),
                SchemeHandler::JwtBearer,
                instance.display_name.clone(),
            )
            .with_context(|| format!("OIDC instance '{}'", instance.scheme))?;

            tracing::debug!(
                scheme = %options.scheme,
                authority = %options.authority,
                "Wired OIDC bearer scheme"
            );
            services.add_keyed_singleton::<OidcOptions>(instance.scheme.clone(), Arc::new(options));
        }

        apply_default_scheme(section, auth)
    }
}
