//! Route pipeline
//!
//! Binds one receiver through a filter chain to one sender. The pipeline
//! owns the lifecycle of its registry handles: starting acquires (or reuses)
//! the plugin instances and subscribes to the receiver fan-out; stopping
//! unsubscribes and releases every handle, tearing instances down when this
//! pipeline was their last holder.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use relay_event::Event;
use relay_filters::FilterChain;
use relay_plugin::{
    EventHandler, Filter, PluginHandle, PluginRegistry, ReceiverFanout, Sender,
};
use relay_route::{DeliveryMode, RouteConfig};
use relay_tenant::TenantId;

use crate::error::{Result, TableError};

/// Pipeline lifecycle.
///
/// `Starting` and `Draining` short-circuit to `Stopped` on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, not yet started
    Unstarted,
    /// Acquiring plugin instances
    Starting,
    /// Subscribed and processing events
    Running,
    /// Unsubscribed, releasing handles
    Draining,
    /// Fully released
    Stopped,
}

/// The event-processing half of a pipeline: chain execution plus
/// delivery-mode acknowledgement discipline. Installed on the receiver
/// fan-out as an [`EventHandler`].
struct PipelineExecutor {
    chain: FilterChain,
    sender: Arc<dyn Sender>,
    delivery_mode: DeliveryMode,
}

#[async_trait]
impl EventHandler for PipelineExecutor {
    async fn handle(&self, event: Event) {
        let survivors = self.chain.execute(event).await;
        match self.delivery_mode {
            DeliveryMode::AtLeastOnce => {
                // The sender owns every terminal; a stuck tree is bounded by
                // the root deadline.
                for event in survivors {
                    self.sender.send(event).await;
                }
            }
            DeliveryMode::AtMostOnce => {
                for event in survivors {
                    event.ack();
                    self.sender.send(event).await;
                }
            }
            DeliveryMode::FireAndForget => {
                for event in &survivors {
                    event.ack();
                }
                for event in survivors {
                    self.sender.send(event).await;
                }
            }
        }
    }
}

struct PipelineRuntime {
    receiver_handle: PluginHandle,
    fanout: Arc<ReceiverFanout>,
    subscription: u64,
    filter_handles: Vec<PluginHandle>,
    sender_handle: PluginHandle,
    executor: Arc<PipelineExecutor>,
}

/// One live route: receiver → filter chain → sender.
pub struct RoutePipeline {
    config: RouteConfig,
    tid: TenantId,
    registry: Arc<PluginRegistry>,
    state: Mutex<PipelineState>,
    runtime: Mutex<Option<PipelineRuntime>>,
}

impl RoutePipeline {
    /// Create an unstarted pipeline for a resolved, validated route.
    pub fn new(config: RouteConfig, tid: TenantId, registry: Arc<PluginRegistry>) -> Self {
        Self {
            config,
            tid,
            registry,
            state: Mutex::new(PipelineState::Unstarted),
            runtime: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// The route definition this pipeline materializes.
    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Acquire plugin instances and begin processing events.
    ///
    /// On failure every already-acquired handle is released and the error is
    /// reported as a registration failure.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != PipelineState::Unstarted {
                return Err(TableError::Registration(format!(
                    "pipeline for route '{}' already started",
                    self.config.id
                )));
            }
            *state = PipelineState::Starting;
        }

        match self.acquire().await {
            Ok(runtime) => {
                let subscription = runtime.fanout.subscribe(runtime.executor.clone());
                let runtime = PipelineRuntime { subscription, ..runtime };
                *self.runtime.lock() = Some(runtime);
                *self.state.lock() = PipelineState::Running;
                tracing::info!(
                    route = %self.config.id,
                    tenant = %self.tid,
                    receiver = %self.config.receiver.plugin,
                    filters = self.config.filter_chain.len(),
                    sender = %self.config.sender.plugin,
                    "pipeline running"
                );
                Ok(())
            }
            Err(err) => {
                *self.state.lock() = PipelineState::Stopped;
                Err(err)
            }
        }
    }

    async fn acquire(&self) -> Result<PipelineRuntime> {
        let mut acquired: Vec<PluginHandle> = Vec::new();

        let receiver = self.registry.register_receiver(
            &self.tid,
            &self.config.receiver.plugin,
            &self.config.receiver.name,
            &self.config.receiver.config,
        );
        let (receiver_handle, fanout) = match receiver {
            Ok(ok) => ok,
            Err(err) => {
                return Err(self.rollback(acquired, err).await);
            }
        };
        acquired.push(receiver_handle.clone());

        let mut filters: Vec<Arc<dyn Filter>> = Vec::with_capacity(self.config.filter_chain.len());
        let mut filter_handles = Vec::with_capacity(self.config.filter_chain.len());
        for node in &self.config.filter_chain {
            match self
                .registry
                .register_filter(&self.tid, &node.plugin, &node.name, &node.config)
            {
                Ok((handle, filter)) => {
                    acquired.push(handle.clone());
                    filter_handles.push(handle);
                    filters.push(filter);
                }
                Err(err) => {
                    return Err(self.rollback(acquired, err).await);
                }
            }
        }

        let sender = self.registry.register_sender(
            &self.tid,
            &self.config.sender.plugin,
            &self.config.sender.name,
            &self.config.sender.config,
        );
        let (sender_handle, sender) = match sender {
            Ok(ok) => ok,
            Err(err) => {
                return Err(self.rollback(acquired, err).await);
            }
        };
        acquired.push(sender_handle.clone());

        let executor = Arc::new(PipelineExecutor {
            chain: FilterChain::new(filters),
            sender,
            delivery_mode: self.config.delivery_mode,
        });

        Ok(PipelineRuntime {
            receiver_handle,
            fanout,
            subscription: 0,
            filter_handles,
            sender_handle,
            executor,
        })
    }

    async fn rollback(
        &self,
        acquired: Vec<PluginHandle>,
        err: relay_plugin::PluginError,
    ) -> TableError {
        for handle in acquired {
            if let Err(release_err) = self.registry.unregister(&handle).await {
                tracing::warn!(%handle, error = %release_err, "rollback release failed");
            }
        }
        TableError::from(err)
    }

    /// Unsubscribe from the receiver and release every handle.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                PipelineState::Running | PipelineState::Starting => {
                    *state = PipelineState::Draining;
                }
                _ => return,
            }
        }

        let runtime = self.runtime.lock().take();
        if let Some(runtime) = runtime {
            runtime.fanout.unsubscribe(runtime.subscription);
            for handle in std::iter::once(&runtime.receiver_handle)
                .chain(runtime.filter_handles.iter())
                .chain(std::iter::once(&runtime.sender_handle))
            {
                if let Err(err) = self.registry.unregister(handle).await {
                    tracing::warn!(%handle, error = %err, "handle release failed");
                }
            }
        }

        *self.state.lock() = PipelineState::Stopped;
        tracing::info!(route = %self.config.id, tenant = %self.tid, "pipeline stopped");
    }

    /// Submit a synthesized event directly to the chain and sender,
    /// bypassing the receiver.
    pub async fn submit(&self, event: Event) -> Result<()> {
        let executor = {
            let runtime = self.runtime.lock();
            match runtime.as_ref() {
                Some(runtime) => Arc::clone(&runtime.executor),
                None => {
                    return Err(TableError::not_found(format!(
                        "live route '{}'",
                        self.config.id
                    )));
                }
            }
        };
        executor.handle(event).await;
        Ok(())
    }
}
