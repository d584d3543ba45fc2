#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shipped registrars wired end to end, including YAML and environment layers.

use std::io::Write;

use secrecy::ExposeSecret;
use serde_json::json;

use modkit_providers::providers::{
    GithubOAuthOptions, GithubProviderCatalog, GithubRegistrar, OidcOptions, OidcRegistrar,
};
use modkit_providers::{
    AuthenticationBuilder, AuthorizationProviderExt, Configuration, HostApplicationBuilder,
    RegistrationError, SchemeHandler,
};

#[test]
fn github_scenario_registers_single_instance() {
    let mut host = HostApplicationBuilder::new(Configuration::from_value(json!({
        "Cirreum": { "Authentication": { "Providers": { "Github": {
            "Instances": [ { "ClientId": "abc" } ]
        } } } }
    })));
    let mut auth = AuthenticationBuilder::new();

    host.register_authorization_provider::<GithubRegistrar>(&mut auth, true)
        .unwrap();

    let catalog = host.services().get::<GithubProviderCatalog>().unwrap();
    assert_eq!(catalog.schemes, ["GitHub"]);

    let options = host
        .services()
        .get_keyed::<GithubOAuthOptions>("GitHub")
        .unwrap();
    assert_eq!(options.client_id, "abc");

    assert_eq!(auth.len(), 1);
    assert_eq!(auth.schemes()[0].handler, SchemeHandler::OAuth);
}

#[test]
fn disabled_instances_are_not_wired() {
    let mut host = HostApplicationBuilder::new(Configuration::from_value(json!({
        "Cirreum": { "Authentication": { "Providers": { "Github": {
            "Instances": [
                { "Scheme": "GitHub", "ClientId": "abc" },
                { "Scheme": "GitHubStaging", "ClientId": "def", "Enabled": false }
            ]
        } } } }
    })));
    let mut auth = AuthenticationBuilder::new();

    host.register_authorization_provider::<GithubRegistrar>(&mut auth, false)
        .unwrap();

    assert!(auth.contains("GitHub"));
    assert!(!auth.contains("GitHubStaging"));
    assert!(
        host.services()
            .get_keyed::<GithubOAuthOptions>("GitHubStaging")
            .is_err()
    );
}

#[test]
fn github_and_oidc_share_one_authentication_builder() {
    let mut host = HostApplicationBuilder::new(Configuration::from_value(json!({
        "Cirreum": { "Authentication": { "Providers": {
            "Github": {
                "Instances": [ { "ClientId": "abc" } ]
            },
            "Oidc": {
                "DefaultScheme": "Bearer",
                "Instances": [
                    { "Authority": "https://login.example.com/tenant-a", "ClientId": "api" }
                ]
            }
        } } }
    })));
    let mut auth = AuthenticationBuilder::new();

    host.register_authorization_provider::<GithubRegistrar>(&mut auth, false)
        .unwrap()
        .register_authorization_provider::<OidcRegistrar>(&mut auth, true)
        .unwrap();

    let names: Vec<_> = auth.schemes().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["GitHub", "Bearer"]);
    assert_eq!(auth.default_scheme(), Some("Bearer"));

    let oidc = host.services().get_keyed::<OidcOptions>("Bearer").unwrap();
    assert_eq!(oidc.audience, "api");
}

#[test]
fn scheme_collision_surfaces_as_registrar_error() {
    let mut host = HostApplicationBuilder::new(Configuration::from_value(json!({
        "Cirreum": { "Authentication": { "Providers": { "Oidc": {
            "Instances": [
                { "Authority": "https://a.example.com", "ClientId": "api" },
                { "Authority": "https://b.example.com", "ClientId": "api" }
            ]
        } } } }
    })));
    let mut auth = AuthenticationBuilder::new();

    let err = host
        .register_authorization_provider::<OidcRegistrar>(&mut auth, false)
        .unwrap_err();

    match err {
        RegistrationError::Registrar { registrar, source } => {
            assert_eq!(registrar, "OidcRegistrar");
            assert!(format!("{source:#}").contains("already registered"));
        }
        other => panic!("expected Registrar error, got {other:?}"),
    }
}

#[test]
fn invalid_authority_is_a_configuration_error() {
    let mut host = HostApplicationBuilder::new(Configuration::from_value(json!({
        "Cirreum": { "Authentication": { "Providers": { "Oidc": {
            "Instances": [ { "Authority": "not a url", "ClientId": "api" } ]
        } } } }
    })));
    let mut auth = AuthenticationBuilder::new();

    let err = host
        .register_authorization_provider::<OidcRegistrar>(&mut auth, false)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::ConfigurationInvalid { .. }));
}

#[test]
fn yaml_file_with_environment_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
Cirreum:
  Authentication:
    Providers:
      Github:
        Instances:
          - Scheme: "GitHub"
            ClientId: "from-yaml"
            ClientSecret: "yaml-secret"
"#
    )
    .unwrap();

    temp_env::with_vars(
        [(
            "MODKIT_TEST_Cirreum__Authentication__Providers__Github__Instances__0__ClientId",
            Some("from-env"),
        )],
        || {
            let configuration = Configuration::builder()
                .add_yaml_file(file.path())
                .unwrap()
                .add_env("MODKIT_TEST_")
                .unwrap()
                .build();

            let mut host = HostApplicationBuilder::new(configuration);
            let mut auth = AuthenticationBuilder::new();
            host.register_authorization_provider::<GithubRegistrar>(&mut auth, true)
                .unwrap();

            let options = host
                .services()
                .get_keyed::<GithubOAuthOptions>("GitHub")
                .unwrap();
            assert_eq!(options.client_id, "from-env");
            assert_eq!(
                options
                    .client_secret
                    .as_ref()
                    .map(|s| s.expose_secret().to_owned()),
                Some("yaml-secret".to_owned())
            );
        },
    );
}

#[test]
fn missing_yaml_file_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = Configuration::builder()
        .add_yaml_file(dir.path().join("absent.yaml"))
        .unwrap()
        .build();

    let mut host = HostApplicationBuilder::new(configuration);
    let mut auth = AuthenticationBuilder::new();

    let err = host
        .register_authorization_provider::<GithubRegistrar>(&mut auth, true)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::ConfigurationMissing { .. }));
}

#[test]
fn environment_only_configuration_binds_lowercased_keys() {
    temp_env::with_vars(
        [
            (
                "MODKIT_ENVONLY_Cirreum__Authentication__Providers__Github__Instances__0__ClientId",
                Some("abc"),
            ),
            (
                "MODKIT_ENVONLY_Cirreum__Authentication__Providers__Github__Instances__0__Scopes__0",
                Some("read:user"),
            ),
        ],
        || {
            let configuration = Configuration::builder()
                .add_env("MODKIT_ENVONLY_")
                .unwrap()
                .build();

            let mut host = HostApplicationBuilder::new(configuration);
            let mut auth = AuthenticationBuilder::new();
            host.register_authorization_provider::<GithubRegistrar>(&mut auth, true)
                .unwrap();

            let options = host
                .services()
                .get_keyed::<GithubOAuthOptions>("GitHub")
                .unwrap();
            assert_eq!(options.client_id, "abc");
            assert_eq!(options.scopes, ["read:user"]);
            assert!(auth.contains("GitHub"));
        },
    );
}

#[test]
fn sparse_index_override_appends_instance() {
    let configuration = Configuration::builder()
        .add_value(json!({
            "Cirreum": { "Authentication": { "Providers": { "Github": {
                "Instances": [ { "Scheme": "GitHub", "ClientId": "a" } ]
            } } } }
        }))
        .add_value(json!({
            "cirreum": { "authentication": { "providers": { "github": {
                "instances": { "2": { "scheme": "GitHubStaging", "clientid": "c" } }
            } } } }
        }))
        .build();

    let mut host = HostApplicationBuilder::new(configuration);
    let mut auth = AuthenticationBuilder::new();
    host.register_authorization_provider::<GithubRegistrar>(&mut auth, true)
        .unwrap();

    let catalog = host.services().get::<GithubProviderCatalog>().unwrap();
    assert_eq!(catalog.schemes, ["GitHub", "GitHubStaging"]);
}
