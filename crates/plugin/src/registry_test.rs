use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use relay_event::Event;

use super::*;
use crate::traits::EventHandler;

struct MockReceiver {
    tid: TenantId,
    name: String,
    config: Value,
    stop: Notify,
    receive_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Receiver for MockReceiver {
    async fn receive(&self, _next: Arc<dyn EventHandler>) -> Result<()> {
        self.receive_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.stop.notified().await;
        Ok(())
    }

    async fn stop_receiving(&self) -> Result<()> {
        self.stop.notify_waiters();
        Ok(())
    }

    fn config(&self) -> Value {
        self.config.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn plugin(&self) -> &str {
        "mock"
    }

    fn tenant(&self) -> &TenantId {
        &self.tid
    }
}

#[derive(Debug)]
struct MockSender {
    tid: TenantId,
    name: String,
    config: Value,
    stopped: AtomicUsize,
}

#[async_trait]
impl Sender for MockSender {
    async fn send(&self, event: Event) {
        event.ack();
    }

    async fn stop_sending(&self) {
        self.stopped.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn config(&self) -> Value {
        self.config.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn plugin(&self) -> &str {
        "mock"
    }

    fn tenant(&self) -> &TenantId {
        &self.tid
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Default)]
struct MockFactory {
    receive_calls: Arc<AtomicUsize>,
}

impl PluginFactory for MockFactory {
    fn new_receiver(
        &self,
        tid: &TenantId,
        _plugin: &str,
        name: &str,
        config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Receiver>> {
        if config.get("bad").is_some() {
            return Err(PluginError::invalid_config("bad receiver config"));
        }
        Ok(Arc::new(MockReceiver {
            tid: tid.clone(),
            name: name.to_string(),
            config: config.clone(),
            stop: Notify::new(),
            receive_calls: Arc::clone(&self.receive_calls),
        }))
    }

    fn new_sender(
        &self,
        tid: &TenantId,
        _plugin: &str,
        name: &str,
        config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Sender>> {
        Ok(Arc::new(MockSender {
            tid: tid.clone(),
            name: name.to_string(),
            config: config.clone(),
            stopped: AtomicUsize::new(0),
        }))
    }
}

fn registry() -> PluginRegistry {
    registry_with_counter().0
}

fn registry_with_counter() -> (PluginRegistry, Arc<AtomicUsize>) {
    let factory = MockFactory::default();
    let receive_calls = Arc::clone(&factory.receive_calls);
    let registry = PluginRegistry::new();
    registry.register_factory("mock", Arc::new(factory));
    (registry, receive_calls)
}

fn tid() -> TenantId {
    TenantId::new("myorg", "myapp").unwrap()
}

#[tokio::test]
async fn test_identical_config_shares_instance() {
    let registry = registry();
    let cfg = json!({"interval": 10});

    let (h1, f1) = registry.register_receiver(&tid(), "mock", "first", &cfg).unwrap();
    let (h2, f2) = registry.register_receiver(&tid(), "mock", "second", &cfg).unwrap();

    assert_ne!(h1, h2);
    assert_eq!(h1.instance_key(), h2.instance_key());
    assert!(Arc::ptr_eq(&f1, &f2));
    assert_eq!(registry.receiver_refcount("mock", &cfg), 2);
    assert_eq!(registry.receiver_status().len(), 1);

    // Name on the shared instance is the first registrant's.
    let status = registry.receiver_status();
    assert_eq!(status.values().next().unwrap().name, "first");

    registry.unregister(&h1).await.unwrap();
    assert_eq!(registry.receiver_refcount("mock", &cfg), 1);
    registry.unregister(&h2).await.unwrap();
    assert_eq!(registry.receiver_refcount("mock", &cfg), 0);
    assert_eq!(registry.live_instance_count(), 0);
}

#[tokio::test]
async fn test_different_config_different_instance() {
    let registry = registry();
    let (h1, f1) = registry
        .register_receiver(&tid(), "mock", "a", &json!({"q": 1}))
        .unwrap();
    let (h2, f2) = registry
        .register_receiver(&tid(), "mock", "b", &json!({"q": 2}))
        .unwrap();

    assert!(!Arc::ptr_eq(&f1, &f2));
    assert_eq!(registry.receiver_status().len(), 2);
    registry.unregister(&h1).await.unwrap();
    registry.unregister(&h2).await.unwrap();
}

#[tokio::test]
async fn test_factory_error_leaves_no_state() {
    let registry = registry();
    let err = registry
        .register_receiver(&tid(), "mock", "bad", &json!({"bad": true}))
        .unwrap_err();
    assert!(matches!(err, PluginError::InvalidConfig(_)));
    assert_eq!(registry.live_instance_count(), 0);
}

#[tokio::test]
async fn test_unknown_plugin_rejected() {
    let registry = registry();
    let err = registry
        .register_sender(&tid(), "nope", "x", &json!({}))
        .unwrap_err();
    assert!(matches!(err, PluginError::UnknownPlugin(_)));
}

#[tokio::test]
async fn test_unsupported_kind_rejected() {
    let registry = registry();
    // MockFactory does not implement filters.
    let err = registry
        .register_filter(&tid(), "mock", "x", &json!({}))
        .unwrap_err();
    assert!(matches!(err, PluginError::UnsupportedKind { .. }));
}

#[tokio::test]
async fn test_sender_stopped_once_on_last_unregister() {
    let registry = registry();
    let cfg = json!({"dest": "null"});
    let (h1, s1) = registry.register_sender(&tid(), "mock", "s", &cfg).unwrap();
    let (h2, _s2) = registry.register_sender(&tid(), "mock", "s", &cfg).unwrap();

    let mock = s1.as_any().downcast_ref::<MockSender>().unwrap();
    registry.unregister(&h1).await.unwrap();
    assert_eq!(mock.stopped.load(AtomicOrdering::SeqCst), 0);
    registry.unregister(&h2).await.unwrap();
    assert_eq!(mock.stopped.load(AtomicOrdering::SeqCst), 1);
}

#[tokio::test]
async fn test_unregister_unknown_handle_is_fatal_kind() {
    let registry = registry();
    let (h, _) = registry.register_sender(&tid(), "mock", "s", &json!({})).unwrap();
    registry.unregister(&h).await.unwrap();
    let err = registry.unregister(&h).await.unwrap_err();
    assert!(matches!(err, PluginError::UnknownHandle(_)));
}

#[tokio::test]
async fn test_receive_called_exactly_once_for_shared_receiver() {
    let (registry, receive_calls) = registry_with_counter();
    let cfg = json!({"single": true});
    let (h1, _) = registry.register_receiver(&tid(), "mock", "a", &cfg).unwrap();
    let (h2, _) = registry.register_receiver(&tid(), "mock", "b", &cfg).unwrap();

    // Give the driver task a chance to enter receive().
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(receive_calls.load(AtomicOrdering::SeqCst), 1);

    registry.unregister(&h1).await.unwrap();
    registry.unregister(&h2).await.unwrap();
}

#[tokio::test]
async fn test_record_error_surfaces_in_status() {
    let registry = registry();
    let (h, _) = registry.register_sender(&tid(), "mock", "s", &json!({})).unwrap();
    registry.record_error(&h, "downstream unreachable");

    let status = registry.sender_status();
    assert_eq!(
        status.values().next().unwrap().last_error.as_deref(),
        Some("downstream unreachable")
    );
    registry.unregister(&h).await.unwrap();
}
