//! Filter config parsing helper

use serde::de::DeserializeOwned;
use serde_json::Value;

use relay_plugin::PluginError;

/// Deserialize an opaque config tree into a filter's config struct.
///
/// A null/absent tree yields the struct's defaults, matching how route
/// definitions omit `config` for filters that need none.
pub(crate) fn parse_config<T: DeserializeOwned>(config: &Value) -> Result<T, PluginError> {
    let source = if config.is_null() {
        Value::Object(Default::default())
    } else {
        config.clone()
    };
    serde_json::from_value(source).map_err(PluginError::invalid_config)
}
