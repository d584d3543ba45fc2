use thiserror::Error;

use crate::config::ConfigError;

/// Failures raised by provider registration.
///
/// An empty `Instances` list is not an error: registration is skipped with a warning.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("configuration required but not found for '{registrar}' at '{path}'")]
    ConfigurationMissing { registrar: String, path: String },

    #[error(
        "invalid configuration for '{registrar}' - section '{path}' exists but cannot be bound to settings"
    )]
    ConfigurationInvalid {
        registrar: String,
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("registrar '{registrar}' failed to register its provider")]
    Registrar {
        registrar: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistrationError {
    /// Name of the registrar the error refers to.
    #[must_use]
    pub fn registrar(&self) -> &str {
        match self {
            RegistrationError::ConfigurationMissing { registrar, .. }
            | RegistrationError::ConfigurationInvalid { registrar, .. }
            | RegistrationError::Registrar { registrar, .. } => registrar,
        }
    }
}
