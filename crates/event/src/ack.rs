//! Acknowledgement tree
//!
//! Each receiver emission roots one tree. Cloning an event inserts an open
//! child under the clone source; terminating a node releases its pending
//! count toward the parent. Parent links are strictly acyclic because a node
//! is only ever created as a child of an existing one.
//!
//! # Completion rules
//!
//! - A node's pending count is itself (1) plus its live children.
//! - `ack` releases the node; when a count reaches zero the release
//!   propagates to the parent. The root completing this way fires the ack
//!   callback.
//! - The first `nack` anywhere records its error and fires the root nack
//!   callback immediately; peers that terminate later only decrement.
//! - A root deadline fires the nack callback with [`AckError::Timeout`] if
//!   the tree is still open when it elapses.
//!
//! Callbacks fire exactly once per tree, whichever rule wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::AckError;
use crate::event::{NackFn, TermFn};

#[cfg(test)]
#[path = "ack_test.rs"]
mod tests;

struct RootState {
    callbacks: Mutex<Option<(TermFn, NackFn)>>,
    first_error: Mutex<Option<AckError>>,
}

impl RootState {
    fn record_error(&self, err: AckError) {
        let mut guard = self.first_error.lock();
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    fn complete_ack(&self) {
        if let Some((on_ack, _)) = self.callbacks.lock().take() {
            on_ack();
        }
    }

    fn complete_nack(&self) {
        if let Some((_, on_nack)) = self.callbacks.lock().take() {
            let err = self
                .first_error
                .lock()
                .clone()
                .unwrap_or_else(|| AckError::Failed("event nacked".to_string()));
            on_nack(err);
        }
    }
}

/// One node in an event's acknowledgement tree.
pub struct AckNode {
    root: Arc<RootState>,
    parent: Option<Arc<AckNode>>,
    /// Self (1) plus live children.
    pending: Mutex<usize>,
    /// Whether this node's own terminal (ack or nack) already fired.
    terminated: AtomicBool,
}

impl AckNode {
    /// Create a tree root with the given terminal callbacks.
    pub fn new_root(on_ack: TermFn, on_nack: NackFn) -> Arc<Self> {
        Arc::new(Self {
            root: Arc::new(RootState {
                callbacks: Mutex::new(Some((on_ack, on_nack))),
                first_error: Mutex::new(None),
            }),
            parent: None,
            pending: Mutex::new(1),
            terminated: AtomicBool::new(false),
        })
    }

    /// Create a root whose terminals are silently discarded.
    pub fn new_detached_root() -> Arc<Self> {
        Self::new_root(Box::new(|| {}), Box::new(|_| {}))
    }

    /// Insert an open child under this node, raising its pending count.
    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        *self.pending.lock() += 1;
        Arc::new(Self {
            root: Arc::clone(&self.root),
            parent: Some(Arc::clone(self)),
            pending: Mutex::new(1),
            terminated: AtomicBool::new(false),
        })
    }

    /// Terminate this node positively.
    pub fn ack(self: &Arc<Self>) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!("duplicate event termination ignored");
            return;
        }
        self.release();
    }

    /// Terminate this node negatively. The first nack in the tree completes
    /// the root immediately with its error.
    pub fn nack(self: &Arc<Self>, err: AckError) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!("duplicate event termination ignored");
            return;
        }
        self.root.record_error(err);
        self.root.complete_nack();
        self.release();
    }

    /// Whether this node's own terminal has fired.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Arm the root deadline. If the tree has not completed when `deadline`
    /// elapses, the nack callback fires with a timeout. Requires a running
    /// tokio runtime; without one the deadline is skipped with a warning.
    pub fn arm_deadline(&self, deadline: Duration) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let root = Arc::clone(&self.root);
                handle.spawn(async move {
                    tokio::time::sleep(deadline).await;
                    root.record_error(AckError::Timeout);
                    root.complete_nack();
                });
            }
            Err(_) => {
                tracing::warn!("no async runtime, ack deadline not armed");
            }
        }
    }

    /// Release one pending count, walking up the parent chain while counts
    /// reach zero. The root draining to zero fires the ack callback (a no-op
    /// if a nack already completed the tree).
    fn release(self: &Arc<Self>) {
        let mut node = Arc::clone(self);
        loop {
            let drained = {
                let mut pending = node.pending.lock();
                *pending = pending.saturating_sub(1);
                *pending == 0
            };
            if !drained {
                return;
            }
            match &node.parent {
                Some(parent) => {
                    let next = Arc::clone(parent);
                    node = next;
                }
                None => {
                    node.root.complete_ack();
                    return;
                }
            }
        }
    }
}
