//! Web service filter
//!
//! Calls an HTTP endpoint synchronously and splices the response at
//! `to_path`. URL and body support `{path}` interpolation against the
//! payload; `secret://` references in the URL resolve through the vault at
//! construction time. With `empty_path_value_required` set, the call is
//! suppressed when `to_path` already holds a value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_event::{get_path, Event};
use relay_plugin::{Filter, PluginError, Result, Vault};
use relay_tenant::TenantId;

use crate::config::parse_config;

/// Web service filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Endpoint, with optional `{path}` references into the payload
    #[serde(default)]
    pub url: String,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Optional request body template with `{path}` references
    #[serde(default)]
    pub body: Option<String>,

    /// Where the response lands in the payload
    #[serde(rename = "toPath", default)]
    pub to_path: String,

    /// Skip the call when `to_path` is already populated
    #[serde(rename = "emptyPathValueRequired", default)]
    pub empty_path_value_required: bool,

    /// Request timeout in milliseconds
    #[serde(rename = "timeoutMs", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// HTTP enrichment filter
#[derive(Debug)]
pub struct WsFilter {
    config: WsConfig,
    url_template: String,
    client: reqwest::Client,
    name: String,
    plugin: String,
    tid: TenantId,
}

impl WsFilter {
    /// Build from an opaque config tree, resolving URL secrets through the
    /// vault.
    pub fn new(
        tid: TenantId,
        plugin: &str,
        name: &str,
        config: &Value,
        secrets: Arc<dyn Vault>,
    ) -> Result<Self> {
        let config: WsConfig = parse_config(config)?;
        if config.url.is_empty() {
            return Err(PluginError::invalid_config("ws filter requires a url"));
        }
        let url_template = secrets
            .resolve(&config.url)
            .ok_or_else(|| PluginError::invalid_config("unresolvable secret in ws url"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(PluginError::invalid_config)?;
        Ok(Self {
            config,
            url_template,
            client,
            name: name.to_string(),
            plugin: plugin.to_string(),
            tid,
        })
    }
}

/// Interpolate `{path}` references against a payload tree.
fn interpolate(template: &str, payload: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(offset) => {
                let path = &rest[start + 1..start + offset];
                match get_path(payload, path) {
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
    out
}

#[async_trait]
impl Filter for WsFilter {
    async fn filter(&self, mut event: Event) -> Vec<Event> {
        if self.config.empty_path_value_required {
            if let Some(existing) = event.get_path_value(&self.config.to_path) {
                if !existing.is_null() {
                    return vec![event];
                }
            }
        }

        let url = interpolate(&self.url_template, event.payload());
        let method = match reqwest::Method::from_bytes(self.config.method.as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                event.nack(format!("invalid ws method '{}'", self.config.method));
                return Vec::new();
            }
        };

        let mut request = self.client.request(method, &url);
        for (key, val) in &self.config.headers {
            request = request.header(key, val);
        }
        if let Some(body) = &self.config.body {
            request = request.body(interpolate(body, event.payload()));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                event.nack(format!("ws call to {} failed: {}", url, err));
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            event.nack(format!("ws call to {} returned {}", url, response.status()));
            return Vec::new();
        }
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                event.nack(format!("ws response read failed: {}", err));
                return Vec::new();
            }
        };
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        event.set_path_value(&self.config.to_path, value, true);
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
