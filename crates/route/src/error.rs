//! Route error types

use thiserror::Error;

/// Result type for route operations
pub type Result<T> = std::result::Result<T, RouteError>;

/// Errors for route configuration and storage
#[derive(Debug, Error)]
pub enum RouteError {
    /// Malformed route definition: bad ids, unresolvable references, cycles
    #[error("bad route config: {0}")]
    BadConfig(String),

    /// Semantic invariant violated (receiver and sender are mandatory)
    #[error("route validation failed: {0}")]
    Validation(String),

    /// Route does not exist
    #[error("route '{route_id}' not found")]
    NotFound {
        /// The missing route id
        route_id: String,
    },

    /// Fragment does not exist
    #[error("fragment '{name}' not found")]
    FragmentNotFound {
        /// The missing fragment name
        name: String,
    },

    /// Storage backend failure
    #[error("route storage error: {0}")]
    Storage(String),
}

impl RouteError {
    /// Create a BadConfig error from any displayable cause
    pub fn bad_config(err: impl std::fmt::Display) -> Self {
        Self::BadConfig(err.to_string())
    }

    /// Create a NotFound error
    pub fn not_found(route_id: impl Into<String>) -> Self {
        Self::NotFound {
            route_id: route_id.into(),
        }
    }

    /// Create a FragmentNotFound error
    pub fn fragment_not_found(name: impl Into<String>) -> Self {
        Self::FragmentNotFound { name: name.into() }
    }

    /// True for the typed not-found variants
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::FragmentNotFound { .. })
    }
}
