//! Debug receiver
//!
//! Emits `rounds` copies of a configured payload, one every `interval_ms`
//! milliseconds, then idles until stopped. A negative round count emits
//! until stopped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use relay_event::Event;
use relay_plugin::{EventHandler, PluginError, Receiver, Result};
use relay_tenant::TenantId;

/// Debug receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReceiverConfig {
    /// Number of events to emit; negative means unbounded
    #[serde(default = "default_rounds")]
    pub rounds: i64,

    /// Milliseconds between emissions
    #[serde(rename = "intervalMs", alias = "intervalMS", default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Payload carried by every emission
    #[serde(default = "default_payload")]
    pub payload: Value,

    /// Bound on the emission history
    #[serde(rename = "maxHistorySize", default = "default_max_history")]
    pub max_history_size: usize,

    /// Milliseconds an emission's ack tree may stay open before it times out
    #[serde(rename = "ackTimeoutMs", default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

fn default_rounds() -> i64 {
    4
}

fn default_interval_ms() -> u64 {
    100
}

fn default_payload() -> Value {
    Value::String("debug".to_string())
}

fn default_max_history() -> usize {
    100
}

fn default_ack_timeout_ms() -> u64 {
    10_000
}

impl Default for DebugReceiverConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            interval_ms: default_interval_ms(),
            payload: default_payload(),
            max_history_size: default_max_history(),
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }
}

/// Interval-driven test receiver
pub struct DebugReceiver {
    config: DebugReceiverConfig,
    name: String,
    plugin: String,
    tid: TenantId,
    stop: watch::Sender<bool>,
    history: Mutex<VecDeque<Value>>,
    acked: Arc<AtomicU64>,
    nacked: Arc<AtomicU64>,
}

impl DebugReceiver {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        let config: DebugReceiverConfig = if config.is_null() {
            DebugReceiverConfig::default()
        } else {
            serde_json::from_value(config.clone()).map_err(PluginError::invalid_config)?
        };
        if config.interval_ms == 0 {
            return Err(PluginError::invalid_config("debug receiver interval must be positive"));
        }
        let (stop, _) = watch::channel(false);
        Ok(Self {
            config,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
            stop,
            history: Mutex::new(VecDeque::new()),
            acked: Arc::new(AtomicU64::new(0)),
            nacked: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Payloads emitted so far, oldest first.
    pub fn history(&self) -> Vec<Value> {
        self.history.lock().iter().cloned().collect()
    }

    /// Emissions whose ack tree completed positively.
    pub fn acked_count(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    /// Emissions whose ack tree completed negatively.
    pub fn nacked_count(&self) -> u64 {
        self.nacked.load(Ordering::SeqCst)
    }

    fn record(&self, payload: &Value) {
        let mut history = self.history.lock();
        history.push_back(payload.clone());
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }

    fn make_event(&self) -> Event {
        let acked = Arc::clone(&self.acked);
        let nacked = Arc::clone(&self.nacked);
        Event::with_ack(
            self.tid.clone(),
            self.config.payload.clone(),
            Box::new(move || {
                acked.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |err| {
                nacked.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(error = %err, "debug emission nacked");
            }),
        )
        .with_deadline(Duration::from_millis(self.config.ack_timeout_ms))
    }
}

#[async_trait]
impl Receiver for DebugReceiver {
    async fn receive(&self, next: Arc<dyn EventHandler>) -> Result<()> {
        let mut stop = self.stop.subscribe();
        if *stop.borrow() {
            return Ok(());
        }
        let mut emitted: i64 = 0;
        while self.config.rounds < 0 || emitted < self.config.rounds {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(self.config.interval_ms)) => {
                    self.record(&self.config.payload);
                    next.handle(self.make_event()).await;
                    emitted += 1;
                }
            }
        }
        // All rounds emitted; stay alive until stopped so shared holders can
        // still observe status.
        loop {
            if stop.changed().await.is_err() || *stop.borrow() {
                return Ok(());
            }
        }
    }

    async fn stop_receiving(&self) -> Result<()> {
        let _ = self.stop.send(true);
        Ok(())
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
