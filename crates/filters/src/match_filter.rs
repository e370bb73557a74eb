//! Match filter
//!
//! Keeps events whose payload satisfies a pattern in `allow` mode, drops them
//! in `deny` mode. Dropped events are acked.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{Filter, PluginError, Result};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Whether a match keeps or drops the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Keep matching events, drop the rest
    #[default]
    Allow,
    /// Drop matching events, keep the rest
    Deny,
}

/// Match filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Pattern tree. String leaves are regexes over string values, other
    /// scalars compare exactly, objects match recursively.
    #[serde(default)]
    pub pattern: Value,

    /// Keep or drop on match
    #[serde(default)]
    pub mode: MatchMode,

    /// Payload subtree the pattern applies to; empty means root
    #[serde(default)]
    pub path: String,
}

/// Pattern-matching filter
#[derive(Debug)]
pub struct MatchFilter {
    config: MatchConfig,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl MatchFilter {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        let config: MatchConfig = parse_config(config)?;
        if config.pattern.is_null() {
            return Err(PluginError::invalid_config("match filter requires a pattern"));
        }
        Ok(Self {
            config,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }

    fn keeps(&self, value: &Value) -> bool {
        let matched = pattern_matches(&self.config.pattern, value);
        match self.config.mode {
            MatchMode::Allow => matched,
            MatchMode::Deny => !matched,
        }
    }
}

/// Recursive structural match.
///
/// Objects require every pattern key to match; arrays require every pattern
/// element to match some value element; string pattern leaves are regexes
/// against string values (falling back to equality when the pattern does not
/// compile); other scalars compare exactly.
fn pattern_matches(pattern: &Value, value: &Value) -> bool {
    match pattern {
        Value::Object(pmap) => match value.as_object() {
            Some(vmap) => pmap.iter().all(|(key, pv)| {
                vmap.get(key).map(|vv| pattern_matches(pv, vv)).unwrap_or(false)
            }),
            None => false,
        },
        Value::Array(parr) => match value.as_array() {
            Some(varr) => parr
                .iter()
                .all(|pv| varr.iter().any(|vv| pattern_matches(pv, vv))),
            None => false,
        },
        Value::String(ps) => match value {
            Value::String(vs) => match Regex::new(ps) {
                Ok(re) => re.is_match(vs),
                Err(_) => ps == vs,
            },
            _ => false,
        },
        _ => pattern == value,
    }
}

#[async_trait]
impl Filter for MatchFilter {
    async fn filter(&self, mut event: Event) -> Vec<Event> {
        let value = match event.get_path_value(&self.config.path) {
            Some(value) => value.clone(),
            None => {
                // Nothing at the path counts as unmatched.
                if self.config.mode == MatchMode::Deny {
                    return vec![event];
                }
                event.ack();
                return Vec::new();
            }
        };

        // An array value with a non-array pattern is matched element-wise:
        // the array is projected down to the elements the mode keeps, and
        // the event drops only when nothing survives.
        if let (Value::Array(elements), false) = (&value, self.config.pattern.is_array()) {
            let kept: Vec<Value> = elements
                .iter()
                .filter(|element| self.keeps(element))
                .cloned()
                .collect();
            if kept.is_empty() {
                event.ack();
                return Vec::new();
            }
            event.set_path_value(&self.config.path, Value::Array(kept), false);
            return vec![event];
        }

        if self.keeps(&value) {
            vec![event]
        } else {
            event.ack();
            Vec::new()
        }
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn plugin(&self) -> &str {
        &self.plugin
    }

    fn tenant(&self) -> &TenantId {
        &self.tid
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tid() -> TenantId {
        TenantId::new("myorg", "myapp").unwrap()
    }

    fn filter(config: Value) -> MatchFilter {
        MatchFilter::new(tid(), "match", "mymatch", &config).unwrap()
    }

    #[tokio::test]
    async fn test_allow_keeps_matching() {
        let f = filter(json!({"pattern": {"foo": "bar"}}));
        let kept = f.filter(Event::new(tid(), json!({"foo": "bar", "x": 1}))).await;
        assert_eq!(kept.len(), 1);

        let dropped = f.filter(Event::new(tid(), json!({"foo": "qux"}))).await;
        assert!(dropped.is_empty());
    }

    #[tokio::test]
    async fn test_deny_drops_matching() {
        let f = filter(json!({"pattern": {"foo": "bar"}, "mode": "deny"}));
        assert!(f.filter(Event::new(tid(), json!({"foo": "bar"}))).await.is_empty());
        assert_eq!(f.filter(Event::new(tid(), json!({"foo": "qux"}))).await.len(), 1);
    }

    #[tokio::test]
    async fn test_regex_string_leaves() {
        let f = filter(json!({"pattern": {"status": "^(ok|done)$"}}));
        assert_eq!(f.filter(Event::new(tid(), json!({"status": "done"}))).await.len(), 1);
        assert!(f.filter(Event::new(tid(), json!({"status": "failed"}))).await.is_empty());
    }

    #[tokio::test]
    async fn test_scalar_and_nested_match() {
        let f = filter(json!({"pattern": {"count": 3, "inner": {"flag": true}}}));
        let matching = json!({"count": 3, "inner": {"flag": true, "extra": 1}});
        assert_eq!(f.filter(Event::new(tid(), matching)).await.len(), 1);

        let wrong = json!({"count": 4, "inner": {"flag": true}});
        assert!(f.filter(Event::new(tid(), wrong)).await.is_empty());
    }

    #[tokio::test]
    async fn test_array_payload_is_projected() {
        let f = filter(json!({"pattern": {"foo": "bar"}}));
        let out = f
            .filter(Event::new(
                tid(),
                json!([{"foo": "bar"}, {"foo": "qux"}, {"foo": "bar"}]),
            ))
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload(), &json!([{"foo": "bar"}, {"foo": "bar"}]));

        let none = f.filter(Event::new(tid(), json!([{"foo": "qux"}]))).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_path_scoped_match() {
        let f = filter(json!({"pattern": {"foo": "bar"}, "path": "nested"}));
        assert_eq!(
            f.filter(Event::new(tid(), json!({"nested": {"foo": "bar"}}))).await.len(),
            1
        );
        assert!(f.filter(Event::new(tid(), json!({"foo": "bar"}))).await.is_empty());
    }

    #[test]
    fn test_missing_pattern_rejected() {
        assert!(MatchFilter::new(tid(), "match", "m", &json!({})).is_err());
    }

    #[tokio::test]
    async fn test_dropped_event_is_acked() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let acked = Arc::new(AtomicUsize::new(0));
        let acked2 = Arc::clone(&acked);
        let event = Event::with_ack(
            tid(),
            json!({"foo": "qux"}),
            Box::new(move || {
                acked2.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(|_| panic!("unexpected nack")),
        );
        let f = filter(json!({"pattern": {"foo": "bar"}}));
        assert!(f.filter(event).await.is_empty());
        assert_eq!(acked.load(Ordering::SeqCst), 1);
    }
}
