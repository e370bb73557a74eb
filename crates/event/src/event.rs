//! Event envelope

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use relay_tenant::TenantId;

use crate::ack::AckNode;
use crate::error::AckError;
use crate::paths;

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;

/// Positive terminal callback for an event tree.
pub type TermFn = Box<dyn FnOnce() + Send>;

/// Negative terminal callback, carrying the first recorded error.
pub type NackFn = Box<dyn FnOnce(AckError) + Send>;

/// An event traversing a route pipeline.
///
/// Owns a JSON payload tree, string metadata, tenant provenance, and one node
/// of an acknowledgement tree. Events are deliberately not `Clone`:
/// [`Event::clone_event`] is the only way to duplicate one, because
/// duplication must register a child in the ack tree.
pub struct Event {
    payload: Value,
    metadata: HashMap<String, String>,
    tenant: TenantId,
    created: DateTime<Utc>,
    trace: bool,
    trace_id: String,
    ack: Arc<AckNode>,
}

impl Event {
    /// Create an event whose terminal callbacks are discarded.
    ///
    /// Useful for tests and for synthesized events whose outcome is only
    /// observed through logs.
    pub fn new(tenant: TenantId, payload: Value) -> Self {
        Self::with_ack(tenant, payload, Box::new(|| {}), Box::new(|_| {}))
    }

    /// Create an event with receiver-level terminal callbacks.
    ///
    /// `on_ack` fires when every fan-out descendant acked; `on_nack` fires
    /// with the first recorded error as soon as any descendant nacks.
    pub fn with_ack(tenant: TenantId, payload: Value, on_ack: TermFn, on_nack: NackFn) -> Self {
        Self {
            payload,
            metadata: HashMap::new(),
            tenant,
            created: Utc::now(),
            trace: false,
            trace_id: Uuid::new_v4().to_string(),
            ack: AckNode::new_root(on_ack, on_nack),
        }
    }

    /// Arm a root deadline: if the ack tree is still open when `deadline`
    /// elapses, the nack callback fires with a timeout.
    #[must_use]
    pub fn with_deadline(self, deadline: Duration) -> Self {
        self.ack.arm_deadline(deadline);
        self
    }

    /// Enable span tracing for this event.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Override the generated trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The payload tree.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Replace the payload root.
    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    /// The owning tenant.
    #[inline]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Creation time.
    #[inline]
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Whether span tracing is enabled.
    #[inline]
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Correlation id for this emission.
    #[inline]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Metadata entries.
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Mutable metadata entries.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.metadata
    }

    /// Resolve a dotted path within the payload.
    pub fn get_path_value(&self, path: &str) -> Option<&Value> {
        paths::get_path(&self.payload, path)
    }

    /// Set a dotted path within the payload, optionally creating missing
    /// intermediate objects. Returns whether the value was stored.
    pub fn set_path_value(&mut self, path: &str, value: Value, create: bool) -> bool {
        paths::set_path(&mut self.payload, path, value, create)
    }

    /// Deep-copy this event, inserting a child node into the ack tree.
    ///
    /// The clone participates in the source's accounting: the source's
    /// terminal only propagates once every clone has terminated too.
    pub fn clone_event(&self) -> Event {
        Event {
            payload: self.payload.clone(),
            metadata: self.metadata.clone(),
            tenant: self.tenant.clone(),
            created: self.created,
            trace: self.trace,
            trace_id: self.trace_id.clone(),
            ack: self.ack.child(),
        }
    }

    /// Terminate this event positively. At most one terminal fires per
    /// event; later calls are logged no-ops.
    pub fn ack(&self) {
        self.ack.ack();
    }

    /// Terminate this event negatively with an error. The first nack in the
    /// tree completes the receiver callback immediately.
    pub fn nack(&self, err: impl std::fmt::Display) {
        self.ack.nack(AckError::failed(err));
    }

    /// Whether this event's own terminal already fired.
    pub fn is_terminated(&self) -> bool {
        self.ack.is_terminated()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("tenant", &self.tenant)
            .field("trace_id", &self.trace_id)
            .field("payload", &self.payload)
            .finish()
    }
}
