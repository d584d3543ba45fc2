use thiserror::Error;

/// Errors raised while assembling authentication schemes.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("authentication scheme '{0}' is already registered")]
    DuplicateScheme(String),

    #[error("authentication scheme name must not be empty")]
    EmptySchemeName,

    #[error("default scheme '{0}' is not registered")]
    UnknownDefaultScheme(String),
}

/// Kind of handler backing a scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeHandler {
    /// Interactive OAuth 2.0 authorization-code flow.
    OAuth,
    /// Bearer tokens validated against an issuer's signing keys.
    JwtBearer,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationScheme {
    pub name: String,
    pub handler: SchemeHandler,
    pub display_name: Option<String>,
}

/// Collects the authentication schemes registrars contribute.
///
/// Scheme names are unique, compared case-insensitively. Order of
/// registration is preserved.
#[derive(Debug, Default)]
pub struct AuthenticationBuilder {
    schemes: Vec<AuthenticationScheme>,
    default_scheme: Option<String>,
}

impl AuthenticationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scheme.
    ///
    /// # Errors
    /// Returns `AuthenticationError::DuplicateScheme` if a scheme with the same
    /// name exists, or `AuthenticationError::EmptySchemeName` for a blank name.
    pub fn add_scheme(
        &mut self,
        name: impl Into<String>,
        handler: SchemeHandler,
        display_name: Option<String>,
    ) -> Result<&mut Self, AuthenticationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthenticationError::EmptySchemeName);
        }
        if self.contains(&name) {
            return Err(AuthenticationError::DuplicateScheme(name));
        }
        self.schemes.push(AuthenticationScheme {
            name,
            handler,
            display_name,
        });
        Ok(self)
    }

    /// Select the scheme used when a request does not name one.
    ///
    /// # Errors
    /// Returns `AuthenticationError::UnknownDefaultScheme` if no such scheme was added.
    pub fn set_default_scheme(&mut self, name: &str) -> Result<&mut Self, AuthenticationError> {
        let scheme = self
            .get(name)
            .ok_or_else(|| AuthenticationError::UnknownDefaultScheme(name.to_owned()))?;
        self.default_scheme = Some(scheme.name.clone());
        Ok(self)
    }

    #[must_use]
    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AuthenticationScheme> {
        self.schemes
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Schemes in registration order.
    #[must_use]
    pub fn schemes(&self) -> &[AuthenticationScheme] {
        &self.schemes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}
