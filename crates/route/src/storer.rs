//! Route storage seam
//!
//! Storage-backend-agnostic CRUD for routes and fragments. Production
//! deployments back this with a shared database so any gateway instance can
//! service any tenant; the in-memory driver is the single-node default and
//! the test fixture.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use relay_tenant::TenantId;

use crate::config::RouteConfig;
use crate::error::{Result, RouteError};
use crate::plugin_config::PluginConfig;

/// Route and fragment persistence.
///
/// The sort key for routes is `(tenant, route id)`; fragments are keyed by
/// `(tenant, fragment name)`.
#[async_trait]
pub trait RouteStorer: Send + Sync {
    /// Fetch one route.
    ///
    /// # Errors
    ///
    /// `RouteError::NotFound` when the route does not exist.
    async fn get_route(&self, tid: &TenantId, route_id: &str) -> Result<RouteConfig>;

    /// Fetch every stored route across tenants.
    async fn get_all_routes(&self) -> Result<Vec<RouteConfig>>;

    /// Fetch every route for one tenant.
    async fn get_all_tenant_routes(&self, tid: &TenantId) -> Result<Vec<RouteConfig>>;

    /// Create or replace a route, stamping `created`/`modified`.
    async fn set_route(&self, config: RouteConfig) -> Result<()>;

    /// Delete a route.
    ///
    /// # Errors
    ///
    /// `RouteError::NotFound` when the route does not exist.
    async fn delete_route(&self, tid: &TenantId, route_id: &str) -> Result<()>;

    /// Fetch one fragment.
    async fn get_fragment(&self, tid: &TenantId, name: &str) -> Result<PluginConfig>;

    /// Fetch every stored fragment across tenants.
    async fn get_all_fragments(&self) -> Result<Vec<PluginConfig>>;

    /// Fetch every fragment for one tenant.
    async fn get_all_tenant_fragments(&self, tid: &TenantId) -> Result<Vec<PluginConfig>>;

    /// Create or replace a fragment under `name`. The stored body's
    /// `fragment_name` may reference a further fragment, forming a chain
    /// resolved at registration time.
    async fn set_fragment(&self, tid: &TenantId, name: &str, fragment: PluginConfig) -> Result<()>;

    /// Delete a fragment.
    async fn delete_fragment(&self, tid: &TenantId, name: &str) -> Result<()>;
}

/// In-memory route storer
#[derive(Debug, Default)]
pub struct InMemoryRouteStorer {
    routes: RwLock<HashMap<(String, String), RouteConfig>>,
    fragments: RwLock<HashMap<(String, String), PluginConfig>>,
}

impl InMemoryRouteStorer {
    /// Create an empty storer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored routes
    pub fn route_count(&self) -> usize {
        self.routes.read().len()
    }
}

#[async_trait]
impl RouteStorer for InMemoryRouteStorer {
    async fn get_route(&self, tid: &TenantId, route_id: &str) -> Result<RouteConfig> {
        self.routes
            .read()
            .get(&(tid.key(), route_id.to_string()))
            .cloned()
            .ok_or_else(|| RouteError::not_found(route_id))
    }

    async fn get_all_routes(&self) -> Result<Vec<RouteConfig>> {
        Ok(self.routes.read().values().cloned().collect())
    }

    async fn get_all_tenant_routes(&self, tid: &TenantId) -> Result<Vec<RouteConfig>> {
        let key = tid.key();
        Ok(self
            .routes
            .read()
            .iter()
            .filter(|((tenant, _), _)| *tenant == key)
            .map(|(_, cfg)| cfg.clone())
            .collect())
    }

    async fn set_route(&self, mut config: RouteConfig) -> Result<()> {
        let tid = config.tenant()?;
        let now = Utc::now().timestamp_millis();
        let key = (tid.key(), config.id.clone());
        let mut routes = self.routes.write();
        config.created = routes.get(&key).map(|prior| prior.created).unwrap_or(now);
        config.modified = now;
        routes.insert(key, config);
        Ok(())
    }

    async fn delete_route(&self, tid: &TenantId, route_id: &str) -> Result<()> {
        self.routes
            .write()
            .remove(&(tid.key(), route_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| RouteError::not_found(route_id))
    }

    async fn get_fragment(&self, tid: &TenantId, name: &str) -> Result<PluginConfig> {
        self.fragments
            .read()
            .get(&(tid.key(), name.to_string()))
            .cloned()
            .ok_or_else(|| RouteError::fragment_not_found(name))
    }

    async fn get_all_fragments(&self) -> Result<Vec<PluginConfig>> {
        Ok(self.fragments.read().values().cloned().collect())
    }

    async fn get_all_tenant_fragments(&self, tid: &TenantId) -> Result<Vec<PluginConfig>> {
        let key = tid.key();
        Ok(self
            .fragments
            .read()
            .iter()
            .filter(|((tenant, _), _)| *tenant == key)
            .map(|(_, cfg)| cfg.clone())
            .collect())
    }

    async fn set_fragment(&self, tid: &TenantId, name: &str, fragment: PluginConfig) -> Result<()> {
        if name.is_empty() {
            return Err(RouteError::bad_config("fragment has no name"));
        }
        self.fragments
            .write()
            .insert((tid.key(), name.to_string()), fragment);
        Ok(())
    }

    async fn delete_fragment(&self, tid: &TenantId, name: &str) -> Result<()> {
        self.fragments
            .write()
            .remove(&(tid.key(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| RouteError::fragment_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tid() -> TenantId {
        TenantId::new("myorg", "myapp").unwrap()
    }

    fn route(id: &str) -> RouteConfig {
        serde_json::from_value(json!({
            "orgId": "myorg",
            "appId": "myapp",
            "id": id,
            "receiver": {"plugin": "debug"},
            "sender": {"plugin": "debug"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_route_crud() {
        let storer = InMemoryRouteStorer::new();
        let tid = tid();

        assert!(storer.get_route(&tid, "r1").await.unwrap_err().is_not_found());

        storer.set_route(route("r1")).await.unwrap();
        storer.set_route(route("r2")).await.unwrap();
        assert_eq!(storer.route_count(), 2);

        let fetched = storer.get_route(&tid, "r1").await.unwrap();
        assert!(fetched.created > 0);
        assert!(fetched.modified >= fetched.created);

        let other = TenantId::new("other", "app").unwrap();
        assert_eq!(storer.get_all_tenant_routes(&tid).await.unwrap().len(), 2);
        assert_eq!(storer.get_all_tenant_routes(&other).await.unwrap().len(), 0);

        storer.delete_route(&tid, "r1").await.unwrap();
        assert!(storer.delete_route(&tid, "r1").await.unwrap_err().is_not_found());
        assert_eq!(storer.get_all_routes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_route_preserves_created() {
        let storer = InMemoryRouteStorer::new();
        storer.set_route(route("r1")).await.unwrap();
        let first = storer.get_route(&tid(), "r1").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        storer.set_route(route("r1")).await.unwrap();
        let second = storer.get_route(&tid(), "r1").await.unwrap();

        assert_eq!(first.created, second.created);
        assert!(second.modified >= first.modified);
    }

    #[tokio::test]
    async fn test_fragment_crud() {
        let storer = InMemoryRouteStorer::new();
        let tid = tid();

        let fragment = PluginConfig::new("debug", json!({"rounds": 1}));
        storer.set_fragment(&tid, "sharedDebug", fragment).await.unwrap();

        let fetched = storer.get_fragment(&tid, "sharedDebug").await.unwrap();
        assert_eq!(fetched.plugin, "debug");
        assert_eq!(storer.get_all_tenant_fragments(&tid).await.unwrap().len(), 1);

        storer.delete_fragment(&tid, "sharedDebug").await.unwrap();
        assert!(storer
            .get_fragment(&tid, "sharedDebug")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_unnamed_fragment_rejected() {
        let storer = InMemoryRouteStorer::new();
        let fragment = PluginConfig::new("debug", json!({}));
        assert!(matches!(
            storer.set_fragment(&tid(), "", fragment).await.unwrap_err(),
            RouteError::BadConfig(_)
        ));
    }
}
