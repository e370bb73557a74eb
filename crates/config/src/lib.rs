//! Relay - Configuration
//!
//! TOML-based configuration with full defaults: an empty config file (or
//! none at all) yields a working single-node gateway.
//!
//! # Example
//!
//! ```toml
//! [api]
//! port = 3000
//!
//! [log]
//! level = "info"
//! format = "console"
//!
//! [sync]
//! interval_secs = 60
//!
//! [webhook]
//! org = "comcast"
//! app = "gears"
//! route_id = "gearsWebhook"
//! ```

mod api;
mod error;
mod gateway;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use api::ApiConfig;
pub use error::{ConfigError, Result};
pub use gateway::{AckConfig, SyncConfig, TenantCacheConfig, WebhookConfig};
pub use logging::{LogConfig, LogFormat, LogLevel};

/// Root gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP control plane
    pub api: ApiConfig,

    /// Internal logging
    pub log: LogConfig,

    /// Route synchronizer
    pub sync: SyncConfig,

    /// Acknowledgement deadlines
    pub ack: AckConfig,

    /// Tenant configuration cache
    pub tenant_cache: TenantCacheConfig,

    /// Global webhook alias, when configured
    pub webhook: Option<WebhookConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            source: err,
        })?;
        text.parse()
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.sync.validate()?;
        if let Some(webhook) = &self.webhook {
            webhook.validate()?;
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_works() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.ack.timeout_secs, 10);
        assert_eq!(config.tenant_cache.ttl_secs, 30);
        assert!(config.webhook.is_none());
    }

    #[test]
    fn test_full_config() {
        let config: Config = r#"
            [api]
            host = "0.0.0.0"
            port = 8080

            [log]
            level = "debug"
            format = "json"

            [sync]
            interval_secs = 5

            [ack]
            timeout_secs = 30

            [tenant_cache]
            ttl_secs = 120

            [webhook]
            org = "comcast"
            app = "gears"
            route_id = "gearsWebhook"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.sync.interval_secs, 5);
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.org, "comcast");
        assert_eq!(webhook.route_id, "gearsWebhook");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!("nonsense = true".parse::<Config>().is_err());
    }

    #[test]
    fn test_zero_sync_interval_rejected() {
        assert!("[sync]\ninterval_secs = 0".parse::<Config>().is_err());
    }

    #[test]
    fn test_partial_webhook_rejected() {
        let result = r#"
            [webhook]
            org = "comcast"
        "#
        .parse::<Config>();
        assert!(result.is_err());
    }
}
