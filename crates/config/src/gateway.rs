//! Gateway runtime configuration sections

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Route synchronizer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Seconds between reconciliation passes
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl SyncConfig {
    /// Validate the interval.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(ConfigError::invalid("sync.interval_secs must be positive"));
        }
        Ok(())
    }
}

/// Acknowledgement deadline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AckConfig {
    /// Seconds an at-least-once event may stay open before it times out
    pub timeout_secs: u64,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Tenant configuration cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantCacheConfig {
    /// Seconds a cached tenant configuration stays fresh
    pub ttl_secs: u64,
}

impl Default for TenantCacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

/// Global webhook alias: `POST /ears/v1/events` dispatches to this route.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Target organization
    pub org: String,

    /// Target application
    pub app: String,

    /// Target route id
    pub route_id: String,
}

impl WebhookConfig {
    /// Validate the alias target.
    pub fn validate(&self) -> Result<()> {
        if self.org.is_empty() || self.app.is_empty() || self.route_id.is_empty() {
            return Err(ConfigError::invalid("webhook alias requires org, app, and route_id"));
        }
        Ok(())
    }
}
