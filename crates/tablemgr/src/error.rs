//! Routing table error types

use thiserror::Error;

use relay_plugin::PluginError;
use relay_route::RouteError;

/// Result type for routing table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors surfaced by the routing table manager
#[derive(Debug, Error)]
pub enum TableError {
    /// Malformed route: bad ids, unresolved fragment, reference cycle
    #[error("bad route config: {0}")]
    BadConfig(String),

    /// Semantic invariant violated (receiver and sender are mandatory)
    #[error("route validation failed: {0}")]
    Validation(String),

    /// A plugin factory failed while materializing the route; the storer
    /// write has been rolled back
    #[error("route registration failed: {0}")]
    Registration(String),

    /// Route or fragment does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Storage backend failure; the synchronizer retries next tick
    #[error("storage error: {0}")]
    Storage(String),
}

impl TableError {
    /// Create a NotFound error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// True for the NotFound variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<RouteError> for TableError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::BadConfig(msg) => Self::BadConfig(msg),
            RouteError::Validation(msg) => Self::Validation(msg),
            RouteError::NotFound { route_id } => Self::NotFound(format!("route '{}'", route_id)),
            RouteError::FragmentNotFound { name } => {
                Self::BadConfig(format!("unresolved fragment '{}'", name))
            }
            RouteError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<PluginError> for TableError {
    fn from(err: PluginError) -> Self {
        Self::Registration(err.to_string())
    }
}
