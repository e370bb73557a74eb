//! Plugin contracts consumed by the gateway core
//!
//! The core never links plugin implementations; it drives them through these
//! object-safe traits. All of them are `Send + Sync` because instances are
//! shared across route pipelines.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use relay_event::Event;
use relay_tenant::TenantId;

use crate::error::Result;
use crate::secret::Vault;

/// Downstream continuation handed to receivers and fan-outs.
#[async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Process one event. The handler owns the event's terminal unless it
    /// passes ownership further downstream.
    async fn handle(&self, event: Event);
}

/// An input source: queue consumer, webhook endpoint, scheduler, ...
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Run the receive loop, emitting every event to `next`. Blocks until
    /// [`Receiver::stop_receiving`] is called. The registry guarantees this
    /// is invoked exactly once per shared instance.
    async fn receive(&self, next: Arc<dyn EventHandler>) -> Result<()>;

    /// Ask the receive loop to return. Callers bound this with a deadline.
    async fn stop_receiving(&self) -> Result<()>;

    /// The opaque configuration this instance was built from.
    fn config(&self) -> Value;

    /// Tenant-facing instance name (the first registrant's).
    fn name(&self) -> &str;

    /// Plugin kind, e.g. `"debug"`.
    fn plugin(&self) -> &str;

    /// Owning tenant.
    fn tenant(&self) -> &TenantId;
}

/// An output sink.
#[async_trait]
pub trait Sender: Send + Sync + std::fmt::Debug {
    /// Deliver one event. The sender must ack or nack it.
    async fn send(&self, event: Event);

    /// Flush and release resources before eviction.
    async fn stop_sending(&self);

    /// The opaque configuration this instance was built from.
    fn config(&self) -> Value;

    /// Tenant-facing instance name.
    fn name(&self) -> &str;

    /// Plugin kind.
    fn plugin(&self) -> &str;

    /// Owning tenant.
    fn tenant(&self) -> &TenantId;

    /// Downcast seam for concrete sender access (diagnostics, tests).
    fn as_any(&self) -> &dyn Any;
}

/// A chain stage: consumes one event, emits zero or more.
///
/// A filter emitting zero events must ack (drop) or nack (fail) its input; a
/// filter that fans out must emit clones so ack accounting is preserved.
#[async_trait]
pub trait Filter: Send + Sync + std::fmt::Debug {
    /// Transform one event into its successors.
    async fn filter(&self, event: Event) -> Vec<Event>;

    /// The opaque configuration this instance was built from.
    fn config(&self) -> Value;

    /// Tenant-facing instance name.
    fn name(&self) -> &str;

    /// Plugin kind.
    fn plugin(&self) -> &str;

    /// Owning tenant.
    fn tenant(&self) -> &TenantId;
}

/// Builds plugin instances from opaque config trees.
///
/// A factory may support any subset of the three kinds; the defaults reject
/// with [`crate::PluginError::UnsupportedKind`].
pub trait PluginFactory: Send + Sync {
    /// Build a receiver.
    fn new_receiver(
        &self,
        _tid: &TenantId,
        plugin: &str,
        _name: &str,
        _config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Receiver>> {
        Err(crate::PluginError::UnsupportedKind {
            plugin: plugin.to_string(),
            kind: "receiver",
        })
    }

    /// Build a sender.
    fn new_sender(
        &self,
        _tid: &TenantId,
        plugin: &str,
        _name: &str,
        _config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Sender>> {
        Err(crate::PluginError::UnsupportedKind {
            plugin: plugin.to_string(),
            kind: "sender",
        })
    }

    /// Build a filter.
    fn new_filter(
        &self,
        _tid: &TenantId,
        plugin: &str,
        _name: &str,
        _config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Filter>> {
        Err(crate::PluginError::UnsupportedKind {
            plugin: plugin.to_string(),
            kind: "filter",
        })
    }
}
