//! Modify filter
//!
//! Uppercases or lowercases string leaves at the listed paths. Missing paths
//! and non-string values are skipped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::Event;
use relay_plugin::{Filter, PluginError, Result};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Modify filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyConfig {
    /// Single path shorthand, merged with `paths`
    #[serde(default)]
    pub path: String,

    /// Paths whose string values are rewritten
    #[serde(default)]
    pub paths: Vec<String>,

    /// Uppercase the values
    #[serde(rename = "toUpper", default)]
    pub to_upper: bool,

    /// Lowercase the values
    #[serde(rename = "toLower", default)]
    pub to_lower: bool,
}

/// String case rewrite filter
#[derive(Debug)]
pub struct ModifyFilter {
    config: ModifyConfig,
    all_paths: Vec<String>,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl ModifyFilter {
    /// Build from an opaque config tree.
    pub fn new(tid: TenantId, plugin: &str, name: &str, config: &Value) -> Result<Self> {
        let config: ModifyConfig = parse_config(config)?;
        if config.to_upper && config.to_lower {
            return Err(PluginError::invalid_config(
                "modify filter cannot both upper and lower case",
            ));
        }
        let mut all_paths = Vec::new();
        if !config.path.is_empty() {
            all_paths.push(config.path.clone());
        }
        all_paths.extend(config.paths.iter().cloned());
        Ok(Self {
            config,
            all_paths,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }
}

#[async_trait]
impl Filter for ModifyFilter {
    async fn filter(&self, mut event: Event) -> Vec<Event> {
        for path in &self.all_paths {
            let rewritten = match event.get_path_value(path) {
                Some(Value::String(text)) => {
                    if self.config.to_upper {
                        Some(text.to_uppercase())
                    } else if self.config.to_lower {
                        Some(text.to_lowercase())
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(text) = rewritten {
                event.set_path_value(path, Value::String(text), false);
            }
        }
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
