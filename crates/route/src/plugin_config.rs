//! Plugin configuration node
//!
//! One node of a route definition: which plugin kind to instantiate and the
//! opaque config tree its factory consumes. A node carrying `fragmentName`
//! is a reference that must be resolved against the tenant's fragment set
//! before registration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_plugin::hasher;

/// A receiver, sender, or filter configuration within a route.
///
/// Accepts both the canonical wire form (`plugin`/`config`) and the legacy
/// flat form (`type`/`params`) on input; always serializes canonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PluginConfigWire")]
pub struct PluginConfig {
    /// Plugin kind selecting the factory, e.g. `"debug"`, `"match"`
    pub plugin: String,

    /// Tenant-scoped handle for this node. Not part of the instance identity.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Opaque configuration tree consumed by the factory
    #[serde(default)]
    pub config: Value,

    /// When set, this node is a reference to a stored fragment
    #[serde(rename = "fragmentName", skip_serializing_if = "Option::is_none")]
    pub fragment_name: Option<String>,
}

impl PluginConfig {
    /// Create a concrete (non-reference) node.
    pub fn new(plugin: impl Into<String>, config: Value) -> Self {
        Self {
            plugin: plugin.into(),
            name: String::new(),
            config,
            fragment_name: None,
        }
    }

    /// Create a fragment reference node.
    pub fn fragment_ref(name: impl Into<String>) -> Self {
        Self {
            plugin: String::new(),
            name: String::new(),
            config: Value::Null,
            fragment_name: Some(name.into()),
        }
    }

    /// Attach a tenant-facing name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this node still references a fragment.
    pub fn is_fragment_ref(&self) -> bool {
        self.fragment_name.is_some()
    }

    /// Instance identity: SHA-256 over kind plus config, excluding `name`.
    pub fn hash(&self) -> String {
        hasher::plugin_hash(&self.plugin, &self.config)
    }
}

#[derive(Deserialize)]
struct PluginConfigWire {
    plugin: Option<String>,
    /// Legacy alias for `plugin`
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    config: Option<Value>,
    /// Legacy alias for `config`
    params: Option<Value>,
    #[serde(rename = "fragmentName")]
    fragment_name: Option<String>,
}

impl From<PluginConfigWire> for PluginConfig {
    fn from(wire: PluginConfigWire) -> Self {
        Self {
            plugin: wire.plugin.or(wire.kind).unwrap_or_default(),
            name: wire.name.unwrap_or_default(),
            config: wire.config.or(wire.params).unwrap_or(Value::Null),
            fragment_name: wire.fragment_name,
        }
    }
}
