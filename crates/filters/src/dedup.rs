//! Dedup filter
//!
//! Drops events whose fingerprint was already seen within a sliding window.
//! The fingerprint is a hash over the values at the configured paths (the
//! whole payload by default); the window is bounded by entry count and
//! optionally by age.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{hasher, Filter, PluginError, Result};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Dedup filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Payload paths contributing to the fingerprint; empty means the whole
    /// payload
    #[serde(default)]
    pub paths: Vec<String>,

    /// Maximum number of remembered fingerprints
    #[serde(rename = "windowSize", default = "default_window_size")]
    pub window_size: usize,

    /// Optional fingerprint age bound in milliseconds
    #[serde(rename = "ttlMs", default)]
    pub ttl_ms: Option<u64>,
}

fn default_window_size() -> usize {
    1000
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            window_size: default_window_size(),
            ttl_ms: None,
        }
    }
}

#[derive(Debug)]
struct Window {
    order: VecDeque<(String, Instant)>,
    seen: HashMap<String, Instant>,
}

/// Sliding-window duplicate suppression filter
#[derive(Debug)]
pub struct DedupFilter {
    config: DedupConfig,
    window: Mutex<Window>,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl DedupFilter {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        let config: DedupConfig = parse_config(config)?;
        if config.window_size == 0 {
            return Err(PluginError::invalid_config("dedup window size must be positive"));
        }
        Ok(Self {
            config,
            window: Mutex::new(Window {
                order: VecDeque::new(),
                seen: HashMap::new(),
            }),
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }

    fn fingerprint(&self, event: &Event) -> String {
        if self.config.paths.is_empty() {
            return hasher::hash_value(event.payload());
        }
        let selected: Vec<Value> = self
            .config
            .paths
            .iter()
            .map(|path| event.get_path_value(path).cloned().unwrap_or(Value::Null))
            .collect();
        hasher::hash_value(&Value::Array(selected))
    }

    /// Record the fingerprint; true when it was already present (duplicate).
    fn check_and_record(&self, fingerprint: String) -> bool {
        let now = Instant::now();
        let ttl = self.config.ttl_ms.map(Duration::from_millis);
        let mut window = self.window.lock();

        // Age out expired entries from the front.
        if let Some(ttl) = ttl {
            loop {
                let expired = matches!(
                    window.order.front(),
                    Some((_, inserted)) if now.duration_since(*inserted) > ttl
                );
                if !expired {
                    break;
                }
                if let Some((key, _)) = window.order.pop_front() {
                    window.seen.remove(&key);
                }
            }
        }

        if let Some(inserted) = window.seen.get(&fingerprint) {
            let fresh = ttl.map(|t| now.duration_since(*inserted) <= t).unwrap_or(true);
            if fresh {
                return true;
            }
        }

        window.order.push_back((fingerprint.clone(), now));
        window.seen.insert(fingerprint, now);
        while window.order.len() > self.config.window_size {
            if let Some((key, _)) = window.order.pop_front() {
                window.seen.remove(&key);
            }
        }
        false
    }
}

#[async_trait]
impl Filter for DedupFilter {
    async fn filter(&self, event: Event) -> Vec<Event> {
        let fingerprint = self.fingerprint(&event);
        if self.check_and_record(fingerprint) {
            event.ack();
            Vec::new()
        } else {
            vec![event]
        }
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
