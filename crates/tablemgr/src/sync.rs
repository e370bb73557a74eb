//! Route synchronizer
//!
//! A background task that pulls the store on an interval and reconciles the
//! local live set against it: routes a peer added appear, routes a peer
//! deleted drain, and hash changes replace the running pipeline. Failures
//! are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::manager::RoutingTableManager;

/// Default reconciliation interval.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic reconciliation driver.
pub struct Synchronizer {
    manager: Arc<RoutingTableManager>,
    interval: Duration,
}

/// Handle controlling a spawned synchronizer task.
pub struct SynchronizerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SynchronizerHandle {
    /// Stop the synchronizer and wait for its task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl Synchronizer {
    /// Create a synchronizer with the default interval.
    pub fn new(manager: Arc<RoutingTableManager>) -> Self {
        Self {
            manager,
            interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Override the reconciliation interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the reconciliation loop.
    pub fn spawn(self) -> SynchronizerHandle {
        let (stop, mut stopped) = watch::channel(false);
        let manager = self.manager;
        let interval = self.interval;
        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs_f64(), "synchronizer started");
            loop {
                tokio::select! {
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        if let Err(err) = manager.sync_all_routes().await {
                            tracing::warn!(error = %err, "sync pass failed, retrying next tick");
                        }
                    }
                }
            }
            tracing::info!("synchronizer stopped");
        });
        SynchronizerHandle { stop, task }
    }
}
