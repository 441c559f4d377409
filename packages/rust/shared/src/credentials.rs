//! Secret resolution.
//!
//! Config files only ever name the environment variable that holds a secret.
//! The actual values are resolved once at process start through a
//! [`CredentialProvider`] and carried as [`Secret`], whose formatting impls
//! never reveal the value.

use std::collections::HashMap;

use crate::error::{LeadlineError, Result};

/// A secret string (password, API key, auth token).
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only call at the point of use (request header, login).
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("****")
    }
}

/// Resolves a named secret.
pub trait CredentialProvider: Send + Sync {
    /// Look up the secret registered under `name`.
    fn secret(&self, name: &str) -> Result<Secret>;
}

/// Reads secrets from environment variables; `name` is the variable name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn secret(&self, name: &str) -> Result<Secret> {
        match std::env::var(name) {
            Ok(val) if !val.is_empty() => Ok(Secret(val)),
            _ => Err(LeadlineError::Credentials(format!(
                "secret not found. Set the {name} environment variable."
            ))),
        }
    }
}

/// Fixed in-memory secrets, resolved up front (tests, embedding).
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    secrets: HashMap<String, Secret>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), Secret::new(value));
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn secret(&self, name: &str) -> Result<Secret> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| LeadlineError::Credentials(format!("no secret registered as {name}")))
    }
}
