//! Debug sender
//!
//! Records every delivered payload in a bounded history, optionally echoing
//! it to stdout or stderr, then acks. The history is the observation point
//! for the integration suite.

use std::any::Any;
use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{PluginError, Result, Sender};
use relay_tenant::TenantId;

/// Where delivered payloads are echoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugDestination {
    /// Echo to stdout
    Stdout,
    /// Echo to stderr
    Stderr,
    /// Record only
    #[default]
    Devnull,
}

/// Debug sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSenderConfig {
    /// Echo destination
    #[serde(default)]
    pub destination: DebugDestination,

    /// Bound on the delivery history
    #[serde(rename = "maxHistorySize", default = "default_max_history")]
    pub max_history_size: usize,
}

fn default_max_history() -> usize {
    100
}

impl Default for DebugSenderConfig {
    fn default() -> Self {
        Self {
            destination: DebugDestination::default(),
            max_history_size: default_max_history(),
        }
    }
}

/// Recording test sender
pub struct DebugSender {
    config: DebugSenderConfig,
    name: String,
    plugin: String,
    tid: TenantId,
    history: Mutex<VecDeque<Value>>,
}

impl DebugSender {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        let config: DebugSenderConfig = if config.is_null() {
            DebugSenderConfig::default()
        } else {
            serde_json::from_value(config.clone()).map_err(PluginError::invalid_config)?
        };
        Ok(Self {
            config,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
            history: Mutex::new(VecDeque::new()),
        })
    }

    /// Payloads delivered so far, oldest first.
    pub fn history(&self) -> Vec<Value> {
        self.history.lock().iter().cloned().collect()
    }

    /// Number of payloads delivered so far.
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

#[async_trait]
impl Sender for DebugSender {
    async fn send(&self, event: Event) {
        let payload = event.payload().clone();
        match self.config.destination {
            DebugDestination::Stdout => println!("{}", payload),
            DebugDestination::Stderr => eprintln!("{}", payload),
            DebugDestination::Devnull => {}
        }
        let mut history = self.history.lock();
        history.push_back(payload);
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
        drop(history);
        event.ack();
    }

    async fn stop_sending(&self) {}

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

    fn as_any(&self) -> &dyn Any {
        self
    }
}
