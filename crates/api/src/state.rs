//! Application state shared by all handlers

use std::sync::Arc;

use relay_config::WebhookConfig;
use relay_tablemgr::RoutingTableManager;
use relay_tenant::{TenantCache, TenantConfig, TenantId, TenantStorer};

use crate::error::Result;

/// Shared state for the control plane.
#[derive(Clone)]
pub struct AppState {
    /// The routing table manager
    pub manager: Arc<RoutingTableManager>,

    /// Tenant configuration storage
    pub tenants: Arc<dyn TenantStorer>,

    /// Read-through tenant cache
    pub tenant_cache: Arc<TenantCache>,

    /// Global webhook alias target, when configured
    pub webhook: Option<WebhookConfig>,
}

impl AppState {
    /// Create state with the given cache TTL and no webhook alias.
    pub fn new(
        manager: Arc<RoutingTableManager>,
        tenants: Arc<dyn TenantStorer>,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            manager,
            tenants,
            tenant_cache: Arc::new(TenantCache::new(cache_ttl_secs)),
            webhook: None,
        }
    }

    /// Configure the global webhook alias.
    #[must_use]
    pub fn with_webhook(mut self, webhook: Option<WebhookConfig>) -> Self {
        self.webhook = webhook;
        self
    }

    /// Fetch a tenant's configuration through the cache.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` when the tenant has no configuration.
    pub async fn tenant_config(&self, tid: &TenantId) -> Result<TenantConfig> {
        if let Some(config) = self.tenant_cache.get(tid) {
            return Ok(config);
        }
        let config = self.tenants.get_config(tid).await?;
        self.tenant_cache.set(config.clone());
        Ok(config)
    }
}
