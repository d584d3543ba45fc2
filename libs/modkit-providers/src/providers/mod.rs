pub mod github;
pub mod oidc;

pub use github::{GithubInstanceSettings, GithubOAuthOptions, GithubProviderCatalog, GithubRegistrar};
pub use oidc::{OidcInstanceSettings, OidcOptions, OidcRegistrar};

use anyhow::Context;

use crate::authentication::AuthenticationBuilder;
use crate::config::ConfigSection;

/// Honor an optional `DefaultScheme` key in the provider section.
fn apply_default_scheme(
    section: &ConfigSection,
    auth: &mut AuthenticationBuilder,
) -> anyhow::Result<()> {
    let Some(name) = section
        .get_section("DefaultScheme")
        .value()
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
    else {
        return Ok(());
    };
    auth.set_default_scheme(&name)
        .with_context(|| format!("DefaultScheme in '{}'", section.path()))?;
    Ok(())
}

fn default_true() -> bool {
    true
}
