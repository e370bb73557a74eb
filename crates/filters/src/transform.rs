//! Transform filter
//!
//! Declarative tree rewrite. The `transformation` tree is evaluated against
//! the payload: object and array nodes recurse, a string leaf of exactly
//! `{path}` is replaced by the payload value at that path, other strings
//! interpolate `{path}` segments textually, and remaining scalars are
//! literal. The result is spliced at `to_path`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::{get_path, Event};
use relay_plugin::{Filter, Result};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Transform filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// The rewrite template; null passes the event through unchanged
    #[serde(default)]
    pub transformation: Value,

    /// Where the result lands; empty replaces the payload root
    #[serde(rename = "toPath", default)]
    pub to_path: String,

    /// Source subtree the template is evaluated against; empty means root.
    /// When the subtree is an array, the template is applied per element.
    #[serde(rename = "fromPath", default)]
    pub from_path: String,
}

/// Declarative rewrite filter
#[derive(Debug)]
pub struct TransformFilter {
    config: TransformConfig,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl TransformFilter {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(config)?,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }
}

/// Evaluate a transformation template against a source tree.
fn apply(template: &Value, source: &Value) -> Value {
    match template {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| (key.clone(), apply(val, source)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(|val| apply(val, source)).collect()),
        Value::String(text) => eval_string(text, source),
        literal => literal.clone(),
    }
}

/// Evaluate one string leaf: a whole-string `{path}` reference yields the
/// referenced value with its type intact; embedded references interpolate
/// into the surrounding text.
fn eval_string(text: &str, source: &Value) -> Value {
    if let Some(path) = whole_reference(text) {
        return get_path(source, path).cloned().unwrap_or(Value::Null);
    }
    if !text.contains('{') {
        return Value::String(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(offset) => {
                let path = &rest[start + 1..start + offset];
                match get_path(source, path) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(value) => out.push_str(&value.to_string()),
                    None => {}
                }
                rest = &rest[start + offset + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_reference(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    if inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

#[async_trait]
impl Filter for TransformFilter {
    async fn filter(&self, mut event: Event) -> Vec<Event> {
        if self.config.transformation.is_null() {
            return vec![event];
        }
        let source = match event.get_path_value(&self.config.from_path) {
            Some(value) => value.clone(),
            None => {
                event.nack(format!("nothing to transform at path '{}'", self.config.from_path));
                return Vec::new();
            }
        };
        let result = match (&source, self.config.from_path.is_empty()) {
            // A selected array subtree is transformed element-wise.
            (Value::Array(elements), false) => Value::Array(
                elements
                    .iter()
                    .map(|element| apply(&self.config.transformation, element))
                    .collect(),
            ),
            _ => apply(&self.config.transformation, &source),
        };
        event.set_path_value(&self.config.to_path, result, true);
        vec![event]
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
