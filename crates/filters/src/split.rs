//! Split filter
//!
//! Reads an array at `path` and fans it out: one clone per element with the
//! element as the new payload root. The original acks once every clone has
//! terminated; a missing path or non-array value nacks the original.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{Filter, Result};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Split filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Location of the array to fan out; empty means the payload root
    #[serde(default)]
    pub path: String,
}

/// Array fan-out filter
#[derive(Debug)]
pub struct SplitFilter {
    config: SplitConfig,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl SplitFilter {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(config)?,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }
}

#[async_trait]
impl Filter for SplitFilter {
    async fn filter(&self, event: Event) -> Vec<Event> {
        let elements = match event.get_path_value(&self.config.path) {
            Some(Value::Array(arr)) => arr.clone(),
            Some(_) => {
                event.nack(format!("split on non-array at path '{}'", self.config.path));
                return Vec::new();
            }
            None => {
                event.nack(format!("nothing to split at path '{}'", self.config.path));
                return Vec::new();
            }
        };

        let mut events = Vec::with_capacity(elements.len());
        for element in elements {
            let mut clone = event.clone_event();
            clone.set_payload(element);
            events.push(clone);
        }
        event.ack();
        events
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn plugin(&self) -> &str {
        &self.plugin
    }

    fn tenant(&self) -> &TenantId {
        &self.tid
    }
}
