//! HTTP control plane configuration

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// HTTP listener configuration
///
/// # Example
///
/// ```toml
/// [api]
/// host = "0.0.0.0"
/// port = 3000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    /// Validate listener settings.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ConfigError::invalid("api.host must not be empty"));
        }
        Ok(())
    }

    /// The `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
