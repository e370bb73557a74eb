//! Receiver fan-out
//!
//! A shared receiver emits each event exactly once; the fan-out multiplexes
//! it to every subscribed route pipeline. Dispatch clones the event once per
//! subscriber so the acknowledgement tree stays tree-shaped: the original
//! acks after dispatch and the receiver-level terminal fires only when every
//! subscriber's clone has terminated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use relay_event::Event;

use crate::traits::EventHandler;

/// Single-writer, multiple-reader event dispatch for a shared receiver.
#[derive(Debug)]
pub struct ReceiverFanout {
    subscribers: RwLock<HashMap<u64, Arc<dyn EventHandler>>>,
    next_id: AtomicU64,
}

impl ReceiverFanout {
    /// Create a fan-out with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attach a subscriber; the returned token unsubscribes it.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(id, handler);
        id
    }

    /// Detach a subscriber.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.write().remove(&id);
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for ReceiverFanout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for ReceiverFanout {
    async fn handle(&self, event: Event) {
        let subscribers: Vec<Arc<dyn EventHandler>> =
            self.subscribers.read().values().cloned().collect();

        if subscribers.is_empty() {
            event.ack();
            return;
        }

        // Dispatch sequentially on the receiver's driver task; back-pressure
        // is cooperative, a slow pipeline slows the receiver.
        for subscriber in subscribers {
            subscriber.handle(event.clone_event()).await;
        }
        event.ack();
    }
}
