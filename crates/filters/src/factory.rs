//! Built-in filter factory
//!
//! One factory serving every built-in filter kind; the registry consults it
//! for `match`, `split`, `transform`, `dedup`, `modify`, and `ws`.

use std::sync::Arc;

use serde_json::Value;

use relay_plugin::{Filter, PluginError, PluginFactory, Result, Vault};
use relay_tenant::TenantId;

use crate::dedup::DedupFilter;
use crate::match_filter::MatchFilter;
use crate::modify::ModifyFilter;
use crate::split::SplitFilter;
use crate::transform::TransformFilter;
use crate::ws::WsFilter;

/// Filter kinds served by [`BuiltinFilterFactory`].
pub const BUILTIN_FILTER_KINDS: &[&str] = &["match", "split", "transform", "dedup", "modify", "ws"];

/// Factory for the built-in filter set.
#[derive(Debug, Default)]
pub struct BuiltinFilterFactory;

impl BuiltinFilterFactory {
    /// Create the factory
    pub fn new() -> Self {
        Self
    }
}

impl PluginFactory for BuiltinFilterFactory {
    fn new_filter(
        &self,
        tid: &TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
        secrets: Arc<dyn Vault>,
    ) -> Result<Arc<dyn Filter>> {
        match plugin {
            "match" => Ok(Arc::new(MatchFilter::new(tid.clone(), plugin, name, config)?)),
            "split" => Ok(Arc::new(SplitFilter::new(tid.clone(), plugin, name, config)?)),
            "transform" => Ok(Arc::new(TransformFilter::new(tid.clone(), plugin, name, config)?)),
            "dedup" => Ok(Arc::new(DedupFilter::new(tid.clone(), plugin, name, config)?)),
            "modify" => Ok(Arc::new(ModifyFilter::new(tid.clone(), plugin, name, config)?)),
            "ws" => Ok(Arc::new(WsFilter::new(tid.clone(), plugin, name, config, secrets)?)),
            other => Err(PluginError::UnknownPlugin(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_plugin::StaticVault;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builds_every_builtin_kind() {
        let factory = BuiltinFilterFactory::new();
        let tid = TenantId::new("myorg", "myapp").unwrap();
        let vault: Arc<dyn Vault> = Arc::new(StaticVault::new());

        let configs = [
            ("match", json!({"pattern": {"a": 1}})),
            ("split", json!({})),
            ("transform", json!({})),
            ("dedup", json!({})),
            ("modify", json!({"toUpper": true})),
            ("ws", json!({"url": "http://localhost/x"})),
        ];
        for (kind, config) in configs {
            let filter = factory
                .new_filter(&tid, kind, "test", &config, Arc::clone(&vault))
                .unwrap_or_else(|e| panic!("{kind}: {e}"));
            assert_eq!(filter.plugin(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let factory = BuiltinFilterFactory::new();
        let tid = TenantId::new("myorg", "myapp").unwrap();
        let err = factory
            .new_filter(&tid, "nope", "x", &json!({}), Arc::new(StaticVault::new()))
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(_)));
    }
}
