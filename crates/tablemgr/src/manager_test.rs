use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use relay_filters::BuiltinFilterFactory;
use relay_plugin::{PluginFactory, PluginRegistry, Sender, Vault};
use relay_plugins::{DebugPluginFactory, DebugSender};
use relay_route::InMemoryRouteStorer;

use super::*;
use crate::sync::Synchronizer;

/// A sender that accepts events but never terminates them.
struct StuckSender {
    tid: TenantId,
    held: Mutex<Vec<Event>>,
}

#[async_trait]
impl Sender for StuckSender {
    async fn send(&self, event: Event) {
        self.held.lock().push(event);
    }

    async fn stop_sending(&self) {}

    fn config(&self) -> Value {
        Value::Null
    }

    fn name(&self) -> &str {
        "stuck"
    }

    fn plugin(&self) -> &str {
        "stuck"
    }

    fn tenant(&self) -> &TenantId {
        &self.tid
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct StuckFactory;

impl PluginFactory for StuckFactory {
    fn new_sender(
        &self,
        tid: &TenantId,
        _plugin: &str,
        _name: &str,
        _config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> relay_plugin::Result<Arc<dyn Sender>> {
        Ok(Arc::new(StuckSender {
            tid: tid.clone(),
            held: Mutex::new(Vec::new()),
        }))
    }
}

fn build_registry() -> Arc<PluginRegistry> {
    let registry = Arc::new(PluginRegistry::new());
    registry.register_factory("debug", Arc::new(DebugPluginFactory::new()));
    registry.register_factory("stuck", Arc::new(StuckFactory));
    for kind in relay_filters::BUILTIN_FILTER_KINDS {
        registry.register_factory(*kind, Arc::new(BuiltinFilterFactory::new()));
    }
    registry
}

fn build_manager() -> Arc<RoutingTableManager> {
    let storer: Arc<dyn RouteStorer> = Arc::new(InMemoryRouteStorer::new());
    Arc::new(RoutingTableManager::new(build_registry(), storer))
}

fn build_manager_with_ack_timeout(ack_timeout: Duration) -> Arc<RoutingTableManager> {
    let storer: Arc<dyn RouteStorer> = Arc::new(InMemoryRouteStorer::new());
    Arc::new(RoutingTableManager::new(build_registry(), storer).with_ack_timeout(ack_timeout))
}

fn tid() -> TenantId {
    TenantId::new("comcast", "xfi").unwrap()
}

/// A quiet debug receiver: one round far in the future, so tests control
/// event flow via route_event.
fn idle_receiver() -> Value {
    json!({"plugin": "debug", "config": {"rounds": 1, "intervalMs": 60000}})
}

fn simple_route(id: &str) -> RouteConfig {
    serde_json::from_value(json!({
        "orgId": "comcast",
        "appId": "xfi",
        "id": id,
        "userId": "boris",
        "receiver": idle_receiver(),
        "sender": {"plugin": "debug", "config": {}},
        "deliveryMode": "at_least_once"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_add_route_materializes() {
    let manager = build_manager();
    let added = manager.add_route(simple_route("r1")).await.unwrap();
    assert_eq!(added.id, "r1");
    assert_eq!(manager.live_route_count(), 1);
    assert_eq!(manager.get_all_tenant_routes(&tid()).await.unwrap().len(), 1);
    assert_eq!(manager.get_all_receivers_status().len(), 1);
    assert_eq!(manager.get_all_senders_status().len(), 1);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let manager = build_manager();
    manager.add_route(simple_route("r1")).await.unwrap();
    let hash_before = manager.live_route_hash(&tid(), "r1").unwrap();

    manager.add_route(simple_route("r1")).await.unwrap();
    assert_eq!(manager.live_route_count(), 1);
    assert_eq!(manager.live_route_hash(&tid(), "r1").unwrap(), hash_before);

    let receivers = manager.get_all_receivers_status();
    assert_eq!(receivers.len(), 1);
    assert_eq!(receivers.values().next().unwrap().reference_count, 1);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_empty_id_defaults_to_route_hash() {
    let manager = build_manager();
    let mut config = simple_route("");
    config.id = String::new();
    let expected = config.hash();
    let added = manager.add_route(config).await.unwrap();
    assert_eq!(added.id, expected);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_replace_on_hash_change() {
    let manager = build_manager();
    manager.add_route(simple_route("r1")).await.unwrap();
    let hash_before = manager.live_route_hash(&tid(), "r1").unwrap();

    let mut changed = simple_route("r1");
    changed.sender = relay_route::PluginConfig::new("debug", json!({"destination": "devnull", "maxHistorySize": 7}));
    manager.add_route(changed).await.unwrap();

    assert_eq!(manager.live_route_count(), 1);
    assert_ne!(manager.live_route_hash(&tid(), "r1").unwrap(), hash_before);
    // The old sender instance was torn down with the replaced pipeline.
    assert_eq!(manager.get_all_senders_status().len(), 1);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_remove_route_returns_refcounts_to_zero() {
    let manager = build_manager();
    manager.add_route(simple_route("r1")).await.unwrap();
    manager.remove_route(&tid(), "r1").await.unwrap();

    assert_eq!(manager.live_route_count(), 0);
    assert!(manager.get_all_receivers_status().is_empty());
    assert!(manager.get_all_senders_status().is_empty());
    assert!(manager.get_route(&tid(), "r1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_remove_unknown_route_is_ok() {
    let manager = build_manager();
    manager.remove_route(&tid(), "ghost").await.unwrap();
}

#[tokio::test]
async fn test_shared_receiver_across_routes() {
    let manager = build_manager();
    // Same receiver config, different senders.
    let mut a = simple_route("a");
    a.sender = relay_route::PluginConfig::new("debug", json!({"maxHistorySize": 11}));
    let mut b = simple_route("b");
    b.sender = relay_route::PluginConfig::new("debug", json!({"maxHistorySize": 22}));

    manager.add_route(a).await.unwrap();
    manager.add_route(b).await.unwrap();

    let receivers = manager.get_all_receivers_status();
    assert_eq!(receivers.len(), 1);
    assert_eq!(receivers.values().next().unwrap().reference_count, 2);
    assert_eq!(manager.get_all_senders_status().len(), 2);

    manager.remove_route(&tid(), "a").await.unwrap();
    let receivers = manager.get_all_receivers_status();
    assert_eq!(receivers.len(), 1);
    assert_eq!(receivers.values().next().unwrap().reference_count, 1);

    manager.remove_route(&tid(), "b").await.unwrap();
    assert!(manager.get_all_receivers_status().is_empty());
}

#[tokio::test]
async fn test_identical_hash_routes_share_all_instances() {
    let manager = build_manager();
    let mut a = simple_route("a");
    a.filter_chain = vec![relay_route::PluginConfig::new(
        "match",
        json!({"pattern": {"foo": "bar"}}),
    )];
    let mut b = simple_route("b");
    b.filter_chain = a.filter_chain.clone();

    manager.add_route(a).await.unwrap();
    manager.add_route(b).await.unwrap();

    assert_eq!(manager.get_all_receivers_status().len(), 1);
    assert_eq!(manager.get_all_senders_status().len(), 1);
    let filters = manager.get_all_filters_status();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters.values().next().unwrap().reference_count, 2);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_unknown_plugin_rolls_back_store() {
    let manager = build_manager();
    let mut config = simple_route("r1");
    config.sender = relay_route::PluginConfig::new("kafka", json!({}));

    let err = manager.add_route(config).await.unwrap_err();
    assert!(matches!(err, TableError::Registration(_)));
    assert_eq!(manager.live_route_count(), 0);
    // Compensation removed the half-written store entry.
    assert!(manager.get_route(&tid(), "r1").await.unwrap_err().is_not_found());
    // The receiver acquired before the sender failure was released.
    assert!(manager.get_all_receivers_status().is_empty());
}

#[tokio::test]
async fn test_missing_sender_rejected() {
    let manager = build_manager();
    let config: RouteConfig = serde_json::from_value(json!({
        "orgId": "comcast",
        "appId": "xfi",
        "id": "r1",
        "receiver": idle_receiver()
    }))
    .unwrap();
    let err = manager.add_route(config).await.unwrap_err();
    assert!(matches!(err, TableError::Validation(_)));
    assert_eq!(manager.live_route_count(), 0);
}

#[tokio::test]
async fn test_unresolved_fragment_is_bad_config() {
    let manager = build_manager();
    let mut config = simple_route("r1");
    config.receiver = relay_route::PluginConfig::fragment_ref("ghost");
    let err = manager.add_route(config).await.unwrap_err();
    match err {
        TableError::BadConfig(msg) => assert!(msg.contains("ghost")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_fragment_resolution_on_add() {
    let manager = build_manager();
    manager
        .add_fragment(
            &tid(),
            "idleDebug",
            relay_route::PluginConfig::new("debug", json!({"rounds": 1, "intervalMs": 60000})),
        )
        .await
        .unwrap();

    let mut config = simple_route("r1");
    config.receiver = relay_route::PluginConfig::fragment_ref("idleDebug");
    manager.add_route(config).await.unwrap();

    let stored = manager.get_route(&tid(), "r1").await.unwrap();
    assert_eq!(stored.receiver.plugin, "debug");
    assert!(!stored.receiver.is_fragment_ref());

    let fragment = manager.get_fragment(&tid(), "idleDebug").await.unwrap();
    assert_eq!(fragment.fragment_name.as_deref(), Some("idleDebug"));
    assert_eq!(manager.get_all_tenant_fragments(&tid()).await.unwrap().len(), 1);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_inactive_route_is_stored_not_materialized() {
    let manager = build_manager();
    let mut config = simple_route("r1");
    config.inactive = true;
    manager.add_route(config).await.unwrap();

    assert_eq!(manager.live_route_count(), 0);
    assert!(manager.get_route(&tid(), "r1").await.is_ok());
}

#[tokio::test]
async fn test_route_event_delivers_through_chain() {
    let manager = build_manager();
    let mut config = simple_route("r1");
    config.filter_chain = vec![
        relay_route::PluginConfig::new("match", json!({"pattern": {"foo": "bar"}, "mode": "allow"})),
        relay_route::PluginConfig::new("split", json!({"path": ""})),
    ];
    manager.add_route(config).await.unwrap();

    // Observe the shared debug sender through a second registration.
    let (handle, sender) = manager
        .registry()
        .register_sender(&tid(), "debug", "probe", &json!({}))
        .unwrap();
    let debug = sender.as_any().downcast_ref::<DebugSender>().unwrap();

    let trace_id = manager
        .route_event(
            &tid(),
            "r1",
            json!([{"foo": "bar"}, {"foo": "qux"}, {"foo": "bar"}]),
        )
        .await
        .unwrap();
    assert!(!trace_id.is_empty());

    assert_eq!(debug.history(), vec![json!({"foo": "bar"}), json!({"foo": "bar"})]);
    // The debug sender acked every survivor inline, settling the tree.
    assert_eq!(manager.submitted_acked_count(), 1);
    assert_eq!(manager.submitted_nacked_count(), 0);

    manager.registry().unregister(&handle).await.unwrap();
    manager.stop_all().await;
}

#[tokio::test]
async fn test_route_event_unknown_route() {
    let manager = build_manager();
    let err = manager.route_event(&tid(), "ghost", json!({})).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_submit_path_deadline_bounds_stuck_sender() {
    let manager = build_manager_with_ack_timeout(Duration::from_millis(50));
    let mut config = simple_route("r1");
    config.sender = relay_route::PluginConfig::new("stuck", json!({}));
    manager.add_route(config).await.unwrap();

    manager.route_event(&tid(), "r1", json!({"k": 1})).await.unwrap();
    assert_eq!(manager.submitted_nacked_count(), 0);

    // The sender never terminates the event; the root deadline does.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(manager.submitted_nacked_count(), 1);
    assert_eq!(manager.submitted_acked_count(), 0);

    manager.stop_all().await;
}

#[tokio::test]
async fn test_sync_converges_to_store() {
    let manager = build_manager();

    // A peer writes directly to the store.
    manager.storer().set_route(simple_route("peer")).await.unwrap();
    assert_eq!(manager.live_route_count(), 0);

    manager.sync_all_routes().await.unwrap();
    assert_eq!(manager.live_route_count(), 1);

    // A peer deletes it again.
    manager.storer().delete_route(&tid(), "peer").await.unwrap();
    manager.sync_all_routes().await.unwrap();
    assert_eq!(manager.live_route_count(), 0);
}

#[tokio::test]
async fn test_sync_replaces_on_hash_change() {
    let manager = build_manager();
    manager.add_route(simple_route("r1")).await.unwrap();
    let hash_before = manager.live_route_hash(&tid(), "r1").unwrap();

    let mut changed = simple_route("r1");
    changed.sender = relay_route::PluginConfig::new("debug", json!({"maxHistorySize": 5}));
    manager.storer().set_route(changed).await.unwrap();

    manager.sync_all_routes().await.unwrap();
    assert_ne!(manager.live_route_hash(&tid(), "r1").unwrap(), hash_before);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_synchronizer_task_converges() {
    let manager = build_manager();
    let handle = Synchronizer::new(Arc::clone(&manager))
        .with_interval(Duration::from_millis(20))
        .spawn();

    manager.storer().set_route(simple_route("peer")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(manager.live_route_count(), 1);

    handle.shutdown().await;
    manager.stop_all().await;
}

#[tokio::test]
async fn test_replace_all_routes_diffs() {
    let manager = build_manager();
    manager.add_route(simple_route("keep")).await.unwrap();
    manager.add_route(simple_route("drop")).await.unwrap();

    let mut added = simple_route("new");
    added.sender = relay_route::PluginConfig::new("debug", json!({"maxHistorySize": 9}));
    manager
        .replace_all_routes(vec![simple_route("keep"), added])
        .await
        .unwrap();

    assert_eq!(manager.live_route_count(), 2);
    assert!(manager.live_route_hash(&tid(), "keep").is_some());
    assert!(manager.live_route_hash(&tid(), "new").is_some());
    assert!(manager.live_route_hash(&tid(), "drop").is_none());
    manager.stop_all().await;
}

#[tokio::test]
async fn test_queries_by_plugin() {
    let manager = build_manager();
    manager.add_route(simple_route("r1")).await.unwrap();

    let by_source = manager.get_routes_by_source_plugin(&tid(), "debug");
    assert_eq!(by_source.len(), 1);
    assert!(manager.get_routes_by_source_plugin(&tid(), "sqs").is_empty());

    let by_dest = manager.get_routes_by_destination_plugin(&tid(), "debug");
    assert_eq!(by_dest.len(), 1);

    let event = relay_event::Event::new(tid(), json!({}));
    assert_eq!(manager.get_routes_for_event(&event).len(), 1);
    manager.stop_all().await;
}

#[tokio::test]
async fn test_end_to_end_debug_emission() {
    let manager = build_manager();
    let config: RouteConfig = serde_json::from_value(json!({
        "orgId": "comcast",
        "appId": "xfi",
        "id": "emit",
        "userId": "boris",
        "srcType": "debug",
        "srcParams": {"rounds": 3, "intervalMs": 10, "payload": {"foo": "bar"}},
        "dstType": "debug",
        "dstParams": {},
        "filterChain": [],
        "deliveryMode": "at_least_once"
    }))
    .unwrap();
    manager.add_route(config).await.unwrap();

    let (handle, sender) = manager
        .registry()
        .register_sender(&tid(), "debug", "probe", &json!({}))
        .unwrap();
    let debug = sender.as_any().downcast_ref::<DebugSender>().unwrap();

    // 3 rounds at 10ms; leave generous margin.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(debug.history(), vec![json!({"foo": "bar"}); 3]);

    manager.registry().unregister(&handle).await.unwrap();
    manager.stop_all().await;
}
