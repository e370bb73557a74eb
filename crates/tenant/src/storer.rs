//! Tenant configuration storage seam
//!
//! Production deployments back this with a shared database; the gateway core
//! only depends on the trait. The in-memory driver doubles as the test
//! fixture and the default for single-node runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::TenantConfig;
use crate::error::{Result, TenantError};
use crate::id::TenantId;

/// Storage-backend-agnostic tenant configuration CRUD.
#[async_trait]
pub trait TenantStorer: Send + Sync {
    /// Fetch one tenant's configuration.
    ///
    /// # Errors
    ///
    /// `TenantError::NotFound` when no configuration exists for the tenant.
    async fn get_config(&self, tid: &TenantId) -> Result<TenantConfig>;

    /// Fetch every stored tenant configuration.
    async fn get_all_configs(&self) -> Result<Vec<TenantConfig>>;

    /// Create or replace a tenant configuration.
    async fn set_config(&self, config: TenantConfig) -> Result<()>;

    /// Delete a tenant configuration. Deleting an absent tenant is an error.
    async fn delete_config(&self, tid: &TenantId) -> Result<()>;
}

/// In-memory tenant storer
#[derive(Debug, Default)]
pub struct InMemoryTenantStorer {
    configs: RwLock<HashMap<String, TenantConfig>>,
}

impl InMemoryTenantStorer {
    /// Create an empty storer
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStorer for InMemoryTenantStorer {
    async fn get_config(&self, tid: &TenantId) -> Result<TenantConfig> {
        self.configs
            .read()
            .get(&tid.key())
            .cloned()
            .ok_or_else(|| TenantError::not_found(tid.key()))
    }

    async fn get_all_configs(&self) -> Result<Vec<TenantConfig>> {
        Ok(self.configs.read().values().cloned().collect())
    }

    async fn set_config(&self, mut config: TenantConfig) -> Result<()> {
        config.touch();
        self.configs.write().insert(config.tenant.key(), config);
        Ok(())
    }

    async fn delete_config(&self, tid: &TenantId) -> Result<()> {
        self.configs
            .write()
            .remove(&tid.key())
            .map(|_| ())
            .ok_or_else(|| TenantError::not_found(tid.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let storer = InMemoryTenantStorer::new();
        let tid = TenantId::new("comcast", "xfi").unwrap();

        assert!(storer.get_config(&tid).await.unwrap_err().is_not_found());

        storer.set_config(TenantConfig::new(tid.clone())).await.unwrap();
        let cfg = storer.get_config(&tid).await.unwrap();
        assert_eq!(cfg.tenant, tid);
        assert_eq!(storer.get_all_configs().await.unwrap().len(), 1);

        storer.delete_config(&tid).await.unwrap();
        assert!(storer.delete_config(&tid).await.unwrap_err().is_not_found());
    }
}
