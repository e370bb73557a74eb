//! Route configuration record

use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_plugin::hasher;
use relay_tenant::TenantId;

use crate::error::{Result, RouteError};
use crate::plugin_config::PluginConfig;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// When the receiver is told an event is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The sender must terminate the event; a root deadline reports timeout
    #[default]
    AtLeastOnce,
    /// The pipeline acks as the event enters the sender
    AtMostOnce,
    /// The pipeline acks at chain exit, before the sender
    FireAndForget,
}

/// A declarative route: receiver → filter chain → sender for one tenant.
///
/// Identity is `(org_id, app_id, id)`. Routes are immutable once stored;
/// a differing definition under the same identity replaces the old one.
///
/// Accepts both the canonical nested wire form and the legacy flat form
/// (`srcType`/`srcParams`, `dstType`/`dstParams`) on input; always
/// serializes canonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RouteConfigWire")]
pub struct RouteConfig {
    /// Organization id
    #[serde(rename = "orgId")]
    pub org_id: String,

    /// Application id
    #[serde(rename = "appId")]
    pub app_id: String,

    /// Route id; empty means "assign the route hash on add"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// The operator who registered the route
    #[serde(rename = "userId", default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Input source configuration
    pub receiver: PluginConfig,

    /// Ordered filter chain; may be empty
    #[serde(rename = "filterChain", default, skip_serializing_if = "Vec::is_empty")]
    pub filter_chain: Vec<PluginConfig>,

    /// Output sink configuration
    pub sender: PluginConfig,

    /// Acknowledgement contract
    #[serde(rename = "deliveryMode", default)]
    pub delivery_mode: DeliveryMode,

    /// Persisted but not materialized while set
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inactive: bool,

    /// Optional route time-to-live
    #[serde(rename = "ttlMs", default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,

    /// Enable per-event trace spans
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,

    /// Creation time, epoch millis; stamped by the storer
    #[serde(default)]
    pub created: i64,

    /// Last modification time, epoch millis; stamped by the storer
    #[serde(default)]
    pub modified: i64,
}

impl RouteConfig {
    /// The owning tenant.
    ///
    /// # Errors
    ///
    /// `RouteError::BadConfig` when the ids do not satisfy the tenant
    /// id pattern.
    pub fn tenant(&self) -> Result<TenantId> {
        TenantId::new(self.org_id.clone(), self.app_id.clone())
            .map_err(|e| RouteError::bad_config(e))
    }

    /// Semantic validation: well-formed tenant ids, a receiver and a sender
    /// with non-empty plugin kinds. An empty filter chain is legal, but
    /// every chain node must be concrete (fragments resolved) with a kind.
    pub fn validate(&self) -> Result<()> {
        self.tenant()?;
        if self.receiver.plugin.is_empty() && !self.receiver.is_fragment_ref() {
            return Err(RouteError::Validation("route has no receiver".to_string()));
        }
        if self.sender.plugin.is_empty() && !self.sender.is_fragment_ref() {
            return Err(RouteError::Validation("route has no sender".to_string()));
        }
        for (i, filter) in self.filter_chain.iter().enumerate() {
            if filter.plugin.is_empty() && !filter.is_fragment_ref() {
                return Err(RouteError::Validation(format!(
                    "filter chain entry {} has no plugin",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Content hash identifying the route's pipeline semantics.
    ///
    /// Excludes `id`, `name`, `userId`, `created`, and `modified`: two
    /// definitions with the same pipeline semantics hash-equal, and an
    /// assigned id (which defaults to this hash) never feeds back into it.
    pub fn hash(&self) -> String {
        let mut tree = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut tree {
            for field in ["id", "name", "userId", "created", "modified"] {
                map.remove(field);
            }
        }
        hasher::hash_value(&tree)
    }
}

#[derive(Deserialize)]
struct RouteConfigWire {
    #[serde(rename = "orgId", default)]
    org_id: String,
    #[serde(rename = "appId", default)]
    app_id: String,
    #[serde(default)]
    id: String,
    #[serde(rename = "userId", default)]
    user_id: String,
    #[serde(default)]
    name: String,
    receiver: Option<PluginConfig>,
    /// Legacy flat receiver kind
    #[serde(rename = "srcType")]
    src_type: Option<String>,
    /// Legacy flat receiver config
    #[serde(rename = "srcParams")]
    src_params: Option<Value>,
    #[serde(rename = "filterChain", default)]
    filter_chain: Vec<PluginConfig>,
    sender: Option<PluginConfig>,
    /// Legacy flat sender kind
    #[serde(rename = "dstType")]
    dst_type: Option<String>,
    /// Legacy flat sender config
    #[serde(rename = "dstParams")]
    dst_params: Option<Value>,
    #[serde(rename = "deliveryMode", default)]
    delivery_mode: DeliveryMode,
    #[serde(default)]
    inactive: bool,
    #[serde(rename = "ttlMs")]
    ttl_ms: Option<u64>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    modified: i64,
}

impl From<RouteConfigWire> for RouteConfig {
    fn from(wire: RouteConfigWire) -> Self {
        let receiver = wire.receiver.unwrap_or_else(|| match wire.src_type {
            Some(kind) => PluginConfig::new(kind, wire.src_params.unwrap_or(Value::Null)),
            None => PluginConfig::new("", Value::Null),
        });
        let sender = wire.sender.unwrap_or_else(|| match wire.dst_type {
            Some(kind) => PluginConfig::new(kind, wire.dst_params.unwrap_or(Value::Null)),
            None => PluginConfig::new("", Value::Null),
        });
        Self {
            org_id: wire.org_id,
            app_id: wire.app_id,
            id: wire.id,
            user_id: wire.user_id,
            name: wire.name,
            receiver,
            filter_chain: wire.filter_chain,
            sender,
            delivery_mode: wire.delivery_mode,
            inactive: wire.inactive,
            ttl_ms: wire.ttl_ms,
            debug: wire.debug,
            created: wire.created,
            modified: wire.modified,
        }
    }
}
