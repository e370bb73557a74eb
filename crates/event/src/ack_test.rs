use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;

struct Outcome {
    acks: AtomicUsize,
    nacks: AtomicUsize,
    error: Mutex<Option<AckError>>,
}

impl Outcome {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            acks: AtomicUsize::new(0),
            nacks: AtomicUsize::new(0),
            error: Mutex::new(None),
        })
    }

    fn root(self: &Arc<Self>) -> Arc<AckNode> {
        let acked = Arc::clone(self);
        let nacked = Arc::clone(self);
        AckNode::new_root(
            Box::new(move || {
                acked.acks.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |err| {
                nacked.nacks.fetch_add(1, Ordering::SeqCst);
                *nacked.error.lock() = Some(err);
            }),
        )
    }

    fn counts(&self) -> (usize, usize) {
        (self.acks.load(Ordering::SeqCst), self.nacks.load(Ordering::SeqCst))
    }
}

#[test]
fn test_single_ack_completes_root() {
    let outcome = Outcome::new();
    let root = outcome.root();
    root.ack();
    assert_eq!(outcome.counts(), (1, 0));
}

#[test]
fn test_duplicate_terminal_is_noop() {
    let outcome = Outcome::new();
    let root = outcome.root();
    root.ack();
    root.ack();
    root.nack(AckError::failed("late"));
    assert_eq!(outcome.counts(), (1, 0));
}

#[test]
fn test_root_waits_for_all_children() {
    let outcome = Outcome::new();
    let root = outcome.root();
    let a = root.child();
    let b = root.child();
    root.ack();
    assert_eq!(outcome.counts(), (0, 0));
    a.ack();
    assert_eq!(outcome.counts(), (0, 0));
    b.ack();
    assert_eq!(outcome.counts(), (1, 0));
}

#[test]
fn test_nested_children() {
    let outcome = Outcome::new();
    let root = outcome.root();
    let child = root.child();
    let grandchild = child.child();
    root.ack();
    child.ack();
    assert_eq!(outcome.counts(), (0, 0));
    grandchild.ack();
    assert_eq!(outcome.counts(), (1, 0));
}

#[test]
fn test_single_nack_fires_root_immediately() {
    let outcome = Outcome::new();
    let root = outcome.root();
    let a = root.child();
    let b = root.child();
    a.nack(AckError::failed("boom"));
    assert_eq!(outcome.counts(), (0, 1));
    assert_eq!(*outcome.error.lock(), Some(AckError::Failed("boom".to_string())));

    // Peers terminating afterwards never re-fire the callbacks.
    b.ack();
    root.ack();
    assert_eq!(outcome.counts(), (0, 1));
}

#[test]
fn test_first_nack_error_wins() {
    let outcome = Outcome::new();
    let root = outcome.root();
    let a = root.child();
    let b = root.child();
    a.nack(AckError::failed("first"));
    b.nack(AckError::failed("second"));
    root.ack();
    assert_eq!(outcome.counts(), (0, 1));
    assert_eq!(*outcome.error.lock(), Some(AckError::Failed("first".to_string())));
}

#[test]
fn test_mixed_terminals_quantified() {
    // c clones with k acks and c+1-k nacks: root nacks iff any nack.
    for clones in 0..4usize {
        for nacks in 0..=(clones + 1) {
            let outcome = Outcome::new();
            let root = outcome.root();
            let children: Vec<_> = (0..clones).map(|_| root.child()).collect();
            let mut terminals: Vec<Arc<AckNode>> = vec![root];
            terminals.extend(children);
            for (i, node) in terminals.iter().enumerate() {
                if i < nacks {
                    node.nack(AckError::failed("bad"));
                } else {
                    node.ack();
                }
            }
            let (acked, nacked) = outcome.counts();
            if nacks > 0 {
                assert_eq!((acked, nacked), (0, 1), "clones={clones} nacks={nacks}");
            } else {
                assert_eq!((acked, nacked), (1, 0), "clones={clones} nacks={nacks}");
            }
        }
    }
}

#[tokio::test]
async fn test_deadline_times_out_open_tree() {
    let outcome = Outcome::new();
    let root = outcome.root();
    let _open_child = root.child();
    root.arm_deadline(Duration::from_millis(20));
    root.ack();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(outcome.counts(), (0, 1));
    assert_eq!(*outcome.error.lock(), Some(AckError::Timeout));
}

#[tokio::test]
async fn test_deadline_noop_after_completion() {
    let outcome = Outcome::new();
    let root = outcome.root();
    root.arm_deadline(Duration::from_millis(20));
    root.ack();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(outcome.counts(), (1, 0));
}
