//! Tenant error types

use thiserror::Error;

/// Result type for tenant operations
pub type Result<T> = std::result::Result<T, TenantError>;

/// Errors for tenant identity and configuration storage
#[derive(Debug, Error)]
pub enum TenantError {
    /// Org or app id does not match the restricted pattern
    #[error("invalid {field} '{value}'")]
    InvalidId {
        /// Which id field failed validation
        field: String,
        /// The offending value
        value: String,
    },

    /// No configuration stored for the tenant
    #[error("tenant '{key}' not found")]
    NotFound {
        /// Tenant key (`org.app`)
        key: String,
    },

    /// Storage backend failure
    #[error("tenant storage error: {0}")]
    Storage(String),
}

impl TenantError {
    /// Create a NotFound error from a tenant key
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// True if this is the typed NotFound variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
