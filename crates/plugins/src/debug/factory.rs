//! Debug plugin factory

use std::sync::Arc;

use serde_json::Value;

use relay_plugin::{PluginFactory, Receiver, Result, Sender, Vault};
use relay_tenant::TenantId;

use super::receiver::DebugReceiver;
use super::sender::DebugSender;

/// Factory for the `debug` receiver/sender pair.
#[derive(Debug, Default)]
pub struct DebugPluginFactory;

impl DebugPluginFactory {
    /// Create the factory
    pub fn new() -> Self {
        Self
    }
}

impl PluginFactory for DebugPluginFactory {
    fn new_receiver(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Receiver>> {
        Ok(Arc::new(DebugReceiver::new(tid.clone(), plugin, name, config)?))
    }

    fn new_sender(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
        _secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Sender>> {
        Ok(Arc::new(DebugSender::new(tid.clone(), plugin, name, config)?))
    }
}
