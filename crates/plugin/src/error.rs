//! Plugin error types

use thiserror::Error;

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors raised by plugin factories and the registry
#[derive(Debug, Error)]
pub enum PluginError {
    /// Malformed plugin config tree
    #[error("invalid plugin config: {0}")]
    InvalidConfig(String),

    /// No factory registered for the plugin kind
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// The factory does not build this kind of instance
    #[error("plugin '{plugin}' does not support {kind} instances")]
    UnsupportedKind {
        /// Plugin kind name
        plugin: String,
        /// receiver, sender, or filter
        kind: &'static str,
    },

    /// A running plugin reported a failure
    #[error("plugin runtime error: {0}")]
    Runtime(String),

    /// StopReceiving did not return within the bounded deadline
    #[error("receiver '{0}' did not stop within deadline, abandoned")]
    StopTimeout(String),

    /// Unregister of a handle the registry does not know. Registry invariant
    /// violation: logged with the handle, the process continues.
    #[error("unknown plugin handle '{0}'")]
    UnknownHandle(String),
}

impl PluginError {
    /// Create an InvalidConfig error from any displayable cause
    pub fn invalid_config(err: impl std::fmt::Display) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
