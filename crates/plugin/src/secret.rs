//! Secret resolution seam
//!
//! Plugin configs may reference secrets as `secret://<name>`; factories
//! resolve them through a [`Vault`] so credentials never live in route
//! definitions.

use std::collections::HashMap;

/// Scheme prefix marking a config value as a secret reference.
pub const SECRET_SCHEME: &str = "secret://";

/// Secret lookup interface handed to plugin factories.
pub trait Vault: Send + Sync {
    /// Resolve a secret by name. `None` when the vault has no such entry.
    fn secret(&self, name: &str) -> Option<String>;

    /// Resolve a config value: `secret://name` references are looked up,
    /// anything else passes through unchanged.
    fn resolve(&self, value: &str) -> Option<String> {
        match value.strip_prefix(SECRET_SCHEME) {
            Some(name) => self.secret(name),
            None => Some(value.to_string()),
        }
    }
}

/// Vault backed by a fixed map. The default for tests and single-node runs.
#[derive(Debug, Default)]
pub struct StaticVault {
    secrets: HashMap<String, String>,
}

impl StaticVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl Vault for StaticVault {
    fn secret(&self, name: &str) -> Option<String> {
        self.secrets.get(name).cloned()
    }
}

/// Vault reading secrets from process environment variables.
#[derive(Debug, Default)]
pub struct EnvVault;

impl Vault for EnvVault {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
