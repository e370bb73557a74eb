//! Routing table manager

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{PluginRegistry, PluginStatus};
use relay_route::{DeliveryMode, PluginConfig, RouteConfig, RouteError, RouteStorer};
use relay_tenant::TenantId;

use crate::error::{Result, TableError};
use crate::pipeline::RoutePipeline;
use crate::resolver::resolve_fragments;

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

/// A materialized route in the live set.
pub struct LiveRoute {
    /// The resolved route definition
    pub config: RouteConfig,
    /// Route content hash, the idempotency key
    pub hash: String,
    pipeline: Arc<RoutePipeline>,
}

/// The authoritative live set per process.
///
/// Management operations (add/remove/replace/sync) are linearized by a
/// single writer lock; queries read a snapshot under a read lock. The store
/// is the source of truth: the live set is its projection for routes not
/// marked inactive, and the synchronizer restores that invariant after any
/// peer's write.
pub struct RoutingTableManager {
    registry: Arc<PluginRegistry>,
    storer: Arc<dyn RouteStorer>,
    live: RwLock<HashMap<(TenantId, String), Arc<LiveRoute>>>,
    write_lock: tokio::sync::Mutex<()>,
    ack_timeout: Duration,
    submitted_acked: Arc<AtomicU64>,
    submitted_nacked: Arc<AtomicU64>,
}

/// Default bound on how long a submitted at-least-once event may stay open.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

impl RoutingTableManager {
    /// Create a manager over a plugin registry and a route store.
    pub fn new(registry: Arc<PluginRegistry>, storer: Arc<dyn RouteStorer>) -> Self {
        Self {
            registry,
            storer,
            live: RwLock::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            submitted_acked: Arc::new(AtomicU64::new(0)),
            submitted_nacked: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the acknowledgement deadline armed on submitted
    /// at-least-once events.
    #[must_use]
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// The plugin registry backing this manager.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The route store backing this manager.
    pub fn storer(&self) -> &Arc<dyn RouteStorer> {
        &self.storer
    }

    // ------------------------------------------------------------------
    // Management operations
    // ------------------------------------------------------------------

    /// Add (or replace) a route.
    ///
    /// Resolves fragments, validates, assigns the route hash as id when the
    /// id is empty, persists, then materializes. Idempotent over
    /// `(tenant, id, hash)`; a differing hash under the same identity
    /// replaces the old pipeline after the new one is running. Registration
    /// failure rolls the storer write back.
    pub async fn add_route(&self, config: RouteConfig) -> Result<RouteConfig> {
        let _guard = self.write_lock.lock().await;
        self.add_route_locked(config).await
    }

    async fn add_route_locked(&self, mut config: RouteConfig) -> Result<RouteConfig> {
        let tid = config.tenant()?;
        resolve_fragments(&self.storer, &tid, &mut config).await?;
        config.validate()?;

        let hash = config.hash();
        if config.id.is_empty() {
            config.id = hash.clone();
        }
        let key = (tid.clone(), config.id.clone());

        let prior = self.live.read().get(&key).cloned();
        if let Some(prior) = &prior {
            if prior.hash == hash {
                tracing::info!(route = %config.id, tenant = %tid, "route unchanged, add is a no-op");
                return Ok(prior.config.clone());
            }
        }

        self.storer.set_route(config.clone()).await?;

        if config.inactive {
            // Persisted but not materialized; drop any running predecessor.
            if let Some(prior) = prior {
                prior.pipeline.stop().await;
                self.live.write().remove(&key);
            }
            tracing::info!(route = %config.id, tenant = %tid, "inactive route stored");
            return Ok(config);
        }

        match self.materialize(&tid, config.clone(), hash).await {
            Ok(()) => {
                if let Some(prior) = prior {
                    prior.pipeline.stop().await;
                }
                Ok(config)
            }
            Err(err) => {
                // Compensate the storer write so store and live set agree.
                if let Err(rollback_err) = self.storer.delete_route(&tid, &config.id).await {
                    tracing::warn!(
                        route = %config.id,
                        error = %rollback_err,
                        "storer rollback after failed registration"
                    );
                }
                Err(err)
            }
        }
    }

    /// Remove a route. Unknown routes degrade to ok with a log line.
    pub async fn remove_route(&self, tid: &TenantId, route_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.remove_route_locked(tid, route_id).await
    }

    async fn remove_route_locked(&self, tid: &TenantId, route_id: &str) -> Result<()> {
        match self.storer.delete_route(tid, route_id).await {
            Ok(()) => {}
            Err(RouteError::NotFound { .. }) => {
                tracing::info!(route = route_id, tenant = %tid, "remove of unknown route ignored");
            }
            Err(err) => return Err(err.into()),
        }
        self.dematerialize(tid, route_id).await;
        Ok(())
    }

    /// Replace the entire live set with `routes`: stop what disappeared,
    /// add what is new, leave hash-equal routes untouched.
    pub async fn replace_all_routes(&self, routes: Vec<RouteConfig>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut target: HashSet<(TenantId, String)> = HashSet::new();
        for config in &routes {
            let tid = config.tenant()?;
            let id = if config.id.is_empty() { config.hash() } else { config.id.clone() };
            target.insert((tid, id));
        }

        let stale: Vec<(TenantId, String)> = self
            .live
            .read()
            .keys()
            .filter(|key| !target.contains(*key))
            .cloned()
            .collect();
        for (tid, route_id) in stale {
            tracing::info!(route = %route_id, tenant = %tid, "route removed by replace");
            if let Err(err) = self.remove_route_locked(&tid, &route_id).await {
                tracing::warn!(route = %route_id, error = %err, "replace removal failed");
            }
        }

        for config in routes {
            if let Err(err) = self.add_route_locked(config).await {
                tracing::warn!(error = %err, "replace add failed");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Materialization primitives (live set only, no storer writes)
    // ------------------------------------------------------------------

    async fn materialize(&self, tid: &TenantId, config: RouteConfig, hash: String) -> Result<()> {
        let pipeline = Arc::new(RoutePipeline::new(
            config.clone(),
            tid.clone(),
            Arc::clone(&self.registry),
        ));
        pipeline.start().await?;
        self.live.write().insert(
            (tid.clone(), config.id.clone()),
            Arc::new(LiveRoute { config, hash, pipeline }),
        );
        Ok(())
    }

    async fn dematerialize(&self, tid: &TenantId, route_id: &str) {
        let removed = self.live.write().remove(&(tid.clone(), route_id.to_string()));
        match removed {
            Some(live) => live.pipeline.stop().await,
            None => {
                tracing::debug!(route = route_id, tenant = %tid, "route was not live");
            }
        }
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// One reconciliation pass: make the live set converge to the store.
    ///
    /// Individual route failures are logged and retried on the next pass.
    pub async fn sync_all_routes(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let stored = self.storer.get_all_routes().await?;

        let mut desired: HashMap<(TenantId, String), RouteConfig> = HashMap::new();
        for config in stored {
            if config.inactive {
                continue;
            }
            match config.tenant() {
                Ok(tid) => {
                    desired.insert((tid, config.id.clone()), config);
                }
                Err(err) => {
                    tracing::warn!(route = %config.id, error = %err, "skipping stored route with bad tenant");
                }
            }
        }

        let live_snapshot: HashMap<(TenantId, String), String> = self
            .live
            .read()
            .iter()
            .map(|(key, live)| (key.clone(), live.hash.clone()))
            .collect();

        let mut added = 0usize;
        let mut removed = 0usize;
        let mut replaced = 0usize;

        for (key, live_hash) in &live_snapshot {
            match desired.get(key) {
                None => {
                    self.dematerialize(&key.0, &key.1).await;
                    removed += 1;
                }
                Some(config) if config.hash() != *live_hash => {
                    self.dematerialize(&key.0, &key.1).await;
                    match self.materialize(&key.0, config.clone(), config.hash()).await {
                        Ok(()) => replaced += 1,
                        Err(err) => {
                            tracing::warn!(route = %key.1, error = %err, "sync replace failed");
                        }
                    }
                }
                Some(_) => {}
            }
        }

        for ((tid, route_id), config) in desired {
            if live_snapshot.contains_key(&(tid.clone(), route_id.clone())) {
                continue;
            }
            match self.materialize(&tid, config.clone(), config.hash()).await {
                Ok(()) => added += 1,
                Err(err) => {
                    tracing::warn!(route = %route_id, error = %err, "sync add failed");
                }
            }
        }

        if added + removed + replaced > 0 {
            tracing::info!(added, removed, replaced, "routing table synchronized");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Fetch one route from the store.
    pub async fn get_route(&self, tid: &TenantId, route_id: &str) -> Result<RouteConfig> {
        Ok(self.storer.get_route(tid, route_id).await?)
    }

    /// Every stored route across tenants.
    pub async fn get_all_routes(&self) -> Result<Vec<RouteConfig>> {
        Ok(self.storer.get_all_routes().await?)
    }

    /// Every stored route for one tenant.
    pub async fn get_all_tenant_routes(&self, tid: &TenantId) -> Result<Vec<RouteConfig>> {
        Ok(self.storer.get_all_tenant_routes(tid).await?)
    }

    /// Live routes whose receiver uses the given plugin kind.
    pub fn get_routes_by_source_plugin(&self, tid: &TenantId, plugin: &str) -> Vec<RouteConfig> {
        self.live
            .read()
            .iter()
            .filter(|((tenant, _), live)| {
                tenant == tid && live.config.receiver.plugin == plugin
            })
            .map(|(_, live)| live.config.clone())
            .collect()
    }

    /// Live routes whose sender uses the given plugin kind.
    pub fn get_routes_by_destination_plugin(&self, tid: &TenantId, plugin: &str) -> Vec<RouteConfig> {
        self.live
            .read()
            .iter()
            .filter(|((tenant, _), live)| {
                tenant == tid && live.config.sender.plugin == plugin
            })
            .map(|(_, live)| live.config.clone())
            .collect()
    }

    /// Live routes an event could have originated from: the event tenant's
    /// routes, narrowed by the `source` metadata entry when present.
    pub fn get_routes_for_event(&self, event: &Event) -> Vec<RouteConfig> {
        match event.metadata().get("source") {
            Some(plugin) => self.get_routes_by_source_plugin(event.tenant(), plugin),
            None => self
                .live
                .read()
                .iter()
                .filter(|((tenant, _), _)| tenant == event.tenant())
                .map(|(_, live)| live.config.clone())
                .collect(),
        }
    }

    /// Number of live (materialized) routes.
    pub fn live_route_count(&self) -> usize {
        self.live.read().len()
    }

    /// Hash of a live route, if materialized.
    pub fn live_route_hash(&self, tid: &TenantId, route_id: &str) -> Option<String> {
        self.live
            .read()
            .get(&(tid.clone(), route_id.to_string()))
            .map(|live| live.hash.clone())
    }

    // ------------------------------------------------------------------
    // Event submission
    // ------------------------------------------------------------------

    /// Synthesize an event and submit it to the named route's chain.
    /// Returns the trace id for correlation.
    ///
    /// For at-least-once routes the event's ack tree is bounded by the
    /// configured deadline, exactly like a receiver-emitted event.
    pub async fn route_event(
        &self,
        tid: &TenantId,
        route_id: &str,
        payload: Value,
    ) -> Result<String> {
        let live = self
            .live
            .read()
            .get(&(tid.clone(), route_id.to_string()))
            .cloned()
            .ok_or_else(|| TableError::not_found(format!("route '{}'", route_id)))?;

        let acked = Arc::clone(&self.submitted_acked);
        let nacked = Arc::clone(&self.submitted_nacked);
        let ack_route = route_id.to_string();
        let nack_route = route_id.to_string();
        let mut event = Event::with_ack(
            tid.clone(),
            payload,
            Box::new(move || {
                acked.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(route = %ack_route, "submitted event settled");
            }),
            Box::new(move |err| {
                nacked.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(route = %nack_route, error = %err, "submitted event failed");
            }),
        )
        .with_trace(live.config.debug);
        if live.config.delivery_mode == DeliveryMode::AtLeastOnce {
            event = event.with_deadline(self.ack_timeout);
        }

        let trace_id = event.trace_id().to_string();
        tracing::debug!(route = route_id, tenant = %tid, trace_id = %trace_id, "event submitted");
        live.pipeline.submit(event).await?;
        Ok(trace_id)
    }

    /// Submitted events whose ack tree completed positively.
    pub fn submitted_acked_count(&self) -> u64 {
        self.submitted_acked.load(Ordering::Relaxed)
    }

    /// Submitted events whose ack tree failed or timed out.
    pub fn submitted_nacked_count(&self) -> u64 {
        self.submitted_nacked.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Fragments
    // ------------------------------------------------------------------

    /// Store a fragment under `name`.
    pub async fn add_fragment(
        &self,
        tid: &TenantId,
        name: &str,
        mut fragment: PluginConfig,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(TableError::BadConfig("missing fragment name".to_string()));
        }
        // The storage key is the identity; an identical self-reference in
        // the body is an artifact of the wire form, not an onward chain.
        if fragment.fragment_name.as_deref() == Some(name) {
            fragment.fragment_name = None;
        }
        Ok(self.storer.set_fragment(tid, name, fragment).await?)
    }

    /// Delete a fragment.
    pub async fn remove_fragment(&self, tid: &TenantId, name: &str) -> Result<()> {
        Ok(self.storer.delete_fragment(tid, name).await?)
    }

    /// Fetch one fragment, stamped with its name.
    pub async fn get_fragment(&self, tid: &TenantId, name: &str) -> Result<PluginConfig> {
        let mut fragment = self.storer.get_fragment(tid, name).await?;
        if fragment.fragment_name.is_none() {
            fragment.fragment_name = Some(name.to_string());
        }
        Ok(fragment)
    }

    /// Every fragment for one tenant.
    pub async fn get_all_tenant_fragments(&self, tid: &TenantId) -> Result<Vec<PluginConfig>> {
        Ok(self.storer.get_all_tenant_fragments(tid).await?)
    }

    /// Every fragment across tenants.
    pub async fn get_all_fragments(&self) -> Result<Vec<PluginConfig>> {
        Ok(self.storer.get_all_fragments().await?)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Status of every live sender, keyed by plugin handle.
    pub fn get_all_senders_status(&self) -> HashMap<String, PluginStatus> {
        self.registry.sender_status()
    }

    /// Status of every live receiver, keyed by plugin handle.
    pub fn get_all_receivers_status(&self) -> HashMap<String, PluginStatus> {
        self.registry.receiver_status()
    }

    /// Status of every live filter, keyed by plugin handle.
    pub fn get_all_filters_status(&self) -> HashMap<String, PluginStatus> {
        self.registry.filter_status()
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Stop every live pipeline. The store is untouched.
    pub async fn stop_all(&self) {
        let _guard = self.write_lock.lock().await;
        let all: Vec<Arc<LiveRoute>> = self.live.write().drain().map(|(_, live)| live).collect();
        for live in all {
            live.pipeline.stop().await;
        }
    }
}

