//! GitHub OAuth provider.
//!
//! ## Configuration
//!
//! ```yaml
//! Cirreum:
//!   Authentication:
//!     Providers:
//!       Github:
//!         DefaultScheme: "GitHub"
//!         Instances:
//!           - Scheme: "GitHub"
//!             ClientId: "Iv1.0123456789abcdef"
//!             ClientSecret: "..."
//!             Scopes: ["read:user", "user:email"]
//!           - Scheme: "GitHubEnterprise"
//!             ClientId: "Iv1.fedcba9876543210"
//!             EnterpriseDomain: "github.corp.example"
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};
use secrecy::{ExposeSecret, SecretString};
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

const GITHUB_HOST: &str = "github.com";
const GITHUB_API_HOST: &str = "api.github.com";

/// One GitHub OAuth application.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GithubInstanceSettings {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub display_name: Option<String>,

    pub client_id: String,

    #[serde(default)]
    pub client_secret: Option<SecretString>,

    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// GitHub Enterprise Server host; `None` targets github.com.
    #[serde(default)]
    pub enterprise_domain: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_scheme() -> String {
    "GitHub".to_owned()
}

fn default_callback_path() -> String {
    "/signin-github".to_owned()
}

impl AuthorizationProviderInstanceSettings for GithubInstanceSettings {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Resolved options for one GitHub scheme, registered keyed by scheme name.
#[derive(Debug)]
pub struct GithubOAuthOptions {
    pub scheme: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub callback_path: String,
    pub scopes: Vec<String>,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub user_information_endpoint: Url,
}

impl GithubOAuthOptions {
    /// Validate an instance and resolve its endpoints.
    ///
    /// # Errors
    /// Fails on an empty `ClientId`, a `CallbackPath` not starting with `/`, or
    /// an `EnterpriseDomain` that does not form a valid URL.
    pub fn from_instance(instance: &GithubInstanceSettings) -> anyhow::Result<Self> {
        if instance.client_id.trim().is_empty() {
            bail!("instance '{}' has an empty ClientId", instance.scheme);
        }
        if !instance.callback_path.starts_with('/') {
            bail!(
                "instance '{}' has CallbackPath '{}' which must start with '/'",
                instance.scheme,
                instance.callback_path
            );
        }

        let (web, api) = match &instance.enterprise_domain {
            Some(domain) => (
                Url::parse(&format!("https://{domain}/"))?,
                Url::parse(&format!("https://{domain}/api/v3/"))?,
            ),
            None => (
                Url::parse(&format!("https://{GITHUB_HOST}/"))?,
                Url::parse(&format!("https://{GITHUB_API_HOST}/"))?,
            ),
        };

        Ok(Self {
            scheme: instance.scheme.clone(),
            client_id: instance.client_id.clone(),
            client_secret: instance
                .client_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_owned())),
            callback_path: instance.callback_path.clone(),
            scopes: instance.scopes.clone(),
            authorization_endpoint: web.join("login/oauth/authorize")?,
            token_endpoint: web.join("login/oauth/access_token")?,
            user_information_endpoint: api.join("user")?,
        })
    }
}

/// Schemes wired by [`GithubRegistrar`], in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubProviderCatalog {
    pub schemes: Vec<String>,
}

/// Registrar for `Cirreum:Authentication:Providers:Github`.
#[derive(Debug, Default)]
pub struct GithubRegistrar;

impl AuthorizationProviderRegistrar for GithubRegistrar {
    type Settings = ProviderSettings<GithubInstanceSettings>;

    fn provider_type(&self) -> ProviderType {
        ProviderType::Authentication
    }

    fn provider_name(&self) -> &'static str {
        "Github"
    }

    fn register(
        &self,
        services: &ServiceCollection,
        settings: &Self::Settings,
        section: &ConfigSection,
        auth: &mut AuthenticationBuilder,
    ) -> anyhow::Result<()> {
        let mut schemes = Vec::new();

        for instance in settings.instances.iter().filter(|i| i.enabled) {
            let options = GithubOAuthOptions::from_instance(instance)?;
            auth.add_scheme(
                instance.scheme.clone(),
                SchemeHandler::OAuth,
                instance.display_name.clone(),
            )
            .with_context(|| format!("GitHub instance '{}'", instance.scheme))?;

            tracing::debug!(scheme = %instance.scheme, "Wired GitHub OAuth scheme");
            services.add_keyed_singleton::<GithubOAuthOptions>(
                instance.scheme.clone(),
                Arc::new(options),
            );
            schemes.push(instance.scheme.clone());
        }

        services.add_singleton(Arc::new(GithubProviderCatalog { schemes }));
        apply_default_scheme(section, auth)
    }
}
