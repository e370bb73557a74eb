//! Shared plugin instance registry
//!
//! Turns `(kind, plugin, name, config)` into a running receiver, sender, or
//! filter, deduplicating by content hash and reference-counting every holder.
//! An instance is created on first registration and torn down exactly when
//! its last holder unregisters.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use relay_tenant::TenantId;

use crate::error::{PluginError, Result};
use crate::fanout::ReceiverFanout;
use crate::hasher;
use crate::secret::{StaticVault, Vault};
use crate::traits::{Filter, PluginFactory, Receiver, Sender};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Default bound on how long `stop_receiving` may take before the receiver
/// is abandoned.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff between receive-loop retries after a receiver error.
const RECEIVER_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Opaque registration token returned to pipelines.
///
/// Shaped `<kind>/<hash-prefix>/<seq>`: the first two segments identify the
/// shared instance, the sequence number the individual holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PluginHandle(String);

impl PluginHandle {
    fn new(kind: Kind, hash: &str, seq: u64) -> Self {
        Self(format!("{}/{}/{}", kind, &hash[..12.min(hash.len())], seq))
    }

    /// The instance identity shared by all holders: `<kind>/<hash-prefix>`.
    pub fn instance_key(&self) -> &str {
        self.0.rsplit_once('/').map(|(head, _)| head).unwrap_or(&self.0)
    }
}

impl fmt::Display for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Receiver,
    Sender,
    Filter,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Receiver => "receiver",
            Kind::Sender => "sender",
            Kind::Filter => "filter",
        })
    }
}

/// Live-instance status surfaced by the control plane.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    /// Plugin kind name, e.g. `"debug"`
    pub plugin: String,
    /// Tenant-facing name (the first registrant's)
    pub name: String,
    /// Owning tenant
    pub tenant: TenantId,
    /// Number of routes holding the instance
    #[serde(rename = "referenceCount")]
    pub reference_count: usize,
    /// The opaque configuration the instance was built from
    pub config: Value,
    /// Most recent runtime error, if any
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
}

struct ReceiverEntry {
    receiver: Arc<dyn Receiver>,
    fanout: Arc<ReceiverFanout>,
    driver: JoinHandle<()>,
    stopping: Arc<AtomicBool>,
    refcount: usize,
    last_error: Arc<Mutex<Option<String>>>,
}

struct SenderEntry {
    sender: Arc<dyn Sender>,
    refcount: usize,
    last_error: Arc<Mutex<Option<String>>>,
}

struct FilterEntry {
    filter: Arc<dyn Filter>,
    refcount: usize,
    last_error: Arc<Mutex<Option<String>>>,
}

struct HandleTarget {
    kind: Kind,
    hash: String,
}

/// Registry of shared plugin instances.
pub struct PluginRegistry {
    factories: Mutex<HashMap<String, Arc<dyn PluginFactory>>>,
    secrets: Arc<dyn Vault>,
    receivers: Mutex<HashMap<String, ReceiverEntry>>,
    senders: Mutex<HashMap<String, SenderEntry>>,
    filters: Mutex<HashMap<String, FilterEntry>>,
    handles: Mutex<HashMap<PluginHandle, HandleTarget>>,
    seq: AtomicU64,
    stop_timeout: Duration,
    abandoned_receivers: AtomicU64,
}

impl PluginRegistry {
    /// Create a registry with an empty vault and the default stop deadline.
    pub fn new() -> Self {
        Self::with_vault(Arc::new(StaticVault::new()))
    }

    /// Create a registry resolving secrets through `vault`.
    pub fn with_vault(vault: Arc<dyn Vault>) -> Self {
        Self {
            factories: Mutex::new(HashMap::new()),
            secrets: vault,
            receivers: Mutex::new(HashMap::new()),
            senders: Mutex::new(HashMap::new()),
            filters: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            abandoned_receivers: AtomicU64::new(0),
        }
    }

    /// Override the `stop_receiving` deadline.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Register a factory under its plugin kind name.
    pub fn register_factory(&self, plugin: impl Into<String>, factory: Arc<dyn PluginFactory>) {
        self.factories.lock().insert(plugin.into(), factory);
    }

    /// Registered plugin kind names.
    pub fn factory_names(&self) -> Vec<String> {
        self.factories.lock().keys().cloned().collect()
    }

    fn factory(&self, plugin: &str) -> Result<Arc<dyn PluginFactory>> {
        self.factories
            .lock()
            .get(plugin)
            .cloned()
            .ok_or_else(|| PluginError::UnknownPlugin(plugin.to_string()))
    }

    fn issue_handle(&self, kind: Kind, hash: &str) -> PluginHandle {
        let handle = PluginHandle::new(kind, hash, self.seq.fetch_add(1, Ordering::Relaxed));
        self.handles.lock().insert(
            handle.clone(),
            HandleTarget {
                kind,
                hash: hash.to_string(),
            },
        );
        handle
    }

    /// Register (or reuse) a receiver instance.
    ///
    /// First registration spawns the driver task; the plugin sees exactly
    /// one `receive()` call no matter how many routes share it. Must run
    /// inside a tokio runtime.
    pub fn register_receiver(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
    ) -> Result<(PluginHandle, Arc<ReceiverFanout>)> {
        let hash = hasher::plugin_hash(plugin, config);
        let mut receivers = self.receivers.lock();
        if let Some(entry) = receivers.get_mut(&hash) {
            entry.refcount += 1;
            let fanout = Arc::clone(&entry.fanout);
            drop(receivers);
            return Ok((self.issue_handle(Kind::Receiver, &hash), fanout));
        }

        let factory = self.factory(plugin)?;
        let receiver = factory.new_receiver(tid, plugin, name, config, Arc::clone(&self.secrets))?;
        let fanout = Arc::new(ReceiverFanout::new());
        let stopping = Arc::new(AtomicBool::new(false));
        let last_error = Arc::new(Mutex::new(None));
        let driver = spawn_receiver_driver(
            Arc::clone(&receiver),
            Arc::clone(&fanout),
            Arc::clone(&stopping),
            Arc::clone(&last_error),
        );

        tracing::info!(plugin, name, tenant = %tid, hash = %&hash[..12], "receiver started");
        receivers.insert(
            hash.clone(),
            ReceiverEntry {
                receiver,
                fanout: Arc::clone(&fanout),
                driver,
                stopping,
                refcount: 1,
                last_error,
            },
        );
        drop(receivers);
        Ok((self.issue_handle(Kind::Receiver, &hash), fanout))
    }

    /// Register (or reuse) a sender instance.
    pub fn register_sender(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
    ) -> Result<(PluginHandle, Arc<dyn Sender>)> {
        let hash = hasher::plugin_hash(plugin, config);
        let mut senders = self.senders.lock();
        if let Some(entry) = senders.get_mut(&hash) {
            entry.refcount += 1;
            let sender = Arc::clone(&entry.sender);
            drop(senders);
            return Ok((self.issue_handle(Kind::Sender, &hash), sender));
        }

        let factory = self.factory(plugin)?;
        let sender = factory.new_sender(tid, plugin, name, config, Arc::clone(&self.secrets))?;
        tracing::info!(plugin, name, tenant = %tid, hash = %&hash[..12], "sender started");
        senders.insert(
            hash.clone(),
            SenderEntry {
                sender: Arc::clone(&sender),
                refcount: 1,
                last_error: Arc::new(Mutex::new(None)),
            },
        );
        drop(senders);
        Ok((self.issue_handle(Kind::Sender, &hash), sender))
    }

    /// Register (or reuse) a filter instance.
    pub fn register_filter(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
    ) -> Result<(PluginHandle, Arc<dyn Filter>)> {
        let hash = hasher::plugin_hash(plugin, config);
        let mut filters = self.filters.lock();
        if let Some(entry) = filters.get_mut(&hash) {
            entry.refcount += 1;
            let filter = Arc::clone(&entry.filter);
            drop(filters);
            return Ok((self.issue_handle(Kind::Filter, &hash), filter));
        }

        let factory = self.factory(plugin)?;
        let filter = factory.new_filter(tid, plugin, name, config, Arc::clone(&self.secrets))?;
        filters.insert(
            hash.clone(),
            FilterEntry {
                filter: Arc::clone(&filter),
                refcount: 1,
                last_error: Arc::new(Mutex::new(None)),
            },
        );
        drop(filters);
        Ok((self.issue_handle(Kind::Filter, &hash), filter))
    }

    /// Release one holder's reference. At refcount zero the instance is
    /// stopped and evicted.
    ///
    /// Unregistering an unknown handle is an invariant violation: it is
    /// logged and reported, but the process continues.
    pub async fn unregister(&self, handle: &PluginHandle) -> Result<()> {
        let target = match self.handles.lock().remove(handle) {
            Some(t) => t,
            None => {
                tracing::error!(%handle, "unregister of unknown plugin handle");
                return Err(PluginError::UnknownHandle(handle.to_string()));
            }
        };

        match target.kind {
            Kind::Receiver => {
                let evicted = {
                    let mut receivers = self.receivers.lock();
                    match receivers.get_mut(&target.hash) {
                        Some(entry) => {
                            entry.refcount -= 1;
                            if entry.refcount == 0 {
                                receivers.remove(&target.hash)
                            } else {
                                None
                            }
                        }
                        None => None,
                    }
                };
                if let Some(entry) = evicted {
                    self.stop_receiver(entry).await;
                }
            }
            Kind::Sender => {
                let evicted = {
                    let mut senders = self.senders.lock();
                    match senders.get_mut(&target.hash) {
                        Some(entry) => {
                            entry.refcount -= 1;
                            if entry.refcount == 0 {
                                senders.remove(&target.hash)
                            } else {
                                None
                            }
                        }
                        None => None,
                    }
                };
                if let Some(entry) = evicted {
                    tracing::info!(plugin = entry.sender.plugin(), "sender stopped");
                    entry.sender.stop_sending().await;
                }
            }
            Kind::Filter => {
                let mut filters = self.filters.lock();
                if let Some(entry) = filters.get_mut(&target.hash) {
                    entry.refcount -= 1;
                    if entry.refcount == 0 {
                        filters.remove(&target.hash);
                    }
                }
            }
        }
        Ok(())
    }

    async fn stop_receiver(&self, entry: ReceiverEntry) {
        entry.stopping.store(true, Ordering::SeqCst);
        let plugin = entry.receiver.plugin().to_string();
        match tokio::time::timeout(self.stop_timeout, entry.receiver.stop_receiving()).await {
            Ok(Ok(())) => {
                tracing::info!(plugin, "receiver stopped");
            }
            Ok(Err(err)) => {
                tracing::warn!(plugin, error = %err, "receiver stop reported error");
            }
            Err(_) => {
                self.abandoned_receivers.fetch_add(1, Ordering::Relaxed);
                *entry.last_error.lock() = Some("stop deadline exceeded".to_string());
                tracing::error!(plugin, "receiver did not stop within deadline, abandoned");
            }
        }
        entry.driver.abort();
    }

    /// Record a runtime error against a live instance. Runtime errors never
    /// tear a shared plugin down; they surface through status.
    pub fn record_error(&self, handle: &PluginHandle, message: impl Into<String>) {
        let target = match self.handles.lock().get(handle) {
            Some(t) => HandleTarget {
                kind: t.kind,
                hash: t.hash.clone(),
            },
            None => return,
        };
        let message = message.into();
        let slot = match target.kind {
            Kind::Receiver => self
                .receivers
                .lock()
                .get(&target.hash)
                .map(|e| Arc::clone(&e.last_error)),
            Kind::Sender => self
                .senders
                .lock()
                .get(&target.hash)
                .map(|e| Arc::clone(&e.last_error)),
            Kind::Filter => self
                .filters
                .lock()
                .get(&target.hash)
                .map(|e| Arc::clone(&e.last_error)),
        };
        if let Some(slot) = slot {
            *slot.lock() = Some(message);
        }
    }

    /// Status of every live receiver, keyed by instance handle.
    pub fn receiver_status(&self) -> HashMap<String, PluginStatus> {
        self.receivers
            .lock()
            .iter()
            .map(|(hash, e)| {
                (
                    format!("receiver/{}", &hash[..12]),
                    PluginStatus {
                        plugin: e.receiver.plugin().to_string(),
                        name: e.receiver.name().to_string(),
                        tenant: e.receiver.tenant().clone(),
                        reference_count: e.refcount,
                        config: e.receiver.config(),
                        last_error: e.last_error.lock().clone(),
                    },
                )
            })
            .collect()
    }

    /// Status of every live sender, keyed by instance handle.
    pub fn sender_status(&self) -> HashMap<String, PluginStatus> {
        self.senders
            .lock()
            .iter()
            .map(|(hash, e)| {
                (
                    format!("sender/{}", &hash[..12]),
                    PluginStatus {
                        plugin: e.sender.plugin().to_string(),
                        name: e.sender.name().to_string(),
                        tenant: e.sender.tenant().clone(),
                        reference_count: e.refcount,
                        config: e.sender.config(),
                        last_error: e.last_error.lock().clone(),
                    },
                )
            })
            .collect()
    }

    /// Status of every live filter, keyed by instance handle.
    pub fn filter_status(&self) -> HashMap<String, PluginStatus> {
        self.filters
            .lock()
            .iter()
            .map(|(hash, e)| {
                (
                    format!("filter/{}", &hash[..12]),
                    PluginStatus {
                        plugin: e.filter.plugin().to_string(),
                        name: e.filter.name().to_string(),
                        tenant: e.filter.tenant().clone(),
                        reference_count: e.refcount,
                        config: e.filter.config(),
                        last_error: e.last_error.lock().clone(),
                    },
                )
            })
            .collect()
    }

    /// Current refcount for a receiver configuration, 0 when not live.
    pub fn receiver_refcount(&self, plugin: &str, config: &Value) -> usize {
        let hash = hasher::plugin_hash(plugin, config);
        self.receivers.lock().get(&hash).map(|e| e.refcount).unwrap_or(0)
    }

    /// Current refcount for a sender configuration, 0 when not live.
    pub fn sender_refcount(&self, plugin: &str, config: &Value) -> usize {
        let hash = hasher::plugin_hash(plugin, config);
        self.senders.lock().get(&hash).map(|e| e.refcount).unwrap_or(0)
    }

    /// Receivers abandoned after missing their stop deadline.
    pub fn abandoned_receiver_count(&self) -> u64 {
        self.abandoned_receivers.load(Ordering::Relaxed)
    }

    /// Total number of live instances across all kinds.
    pub fn live_instance_count(&self) -> usize {
        self.receivers.lock().len() + self.senders.lock().len() + self.filters.lock().len()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive a receiver's receive loop, retrying with a bounded backoff on
/// error. A receiver error never terminates the process.
fn spawn_receiver_driver(
    receiver: Arc<dyn Receiver>,
    fanout: Arc<ReceiverFanout>,
    stopping: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.receive(fanout.clone()).await {
                Ok(()) => break,
                Err(err) => {
                    *last_error.lock() = Some(err.to_string());
                    if stopping.load(Ordering::SeqCst) {
                        break;
                    }
                    tracing::warn!(
                        plugin = receiver.plugin(),
                        error = %err,
                        "receiver error, retrying"
                    );
                    tokio::time::sleep(RECEIVER_RETRY_BACKOFF).await;
                    if stopping.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
    })
}
