//! Relay - Route
//!
//! The declarative route model: plugin configuration nodes, the route record
//! that binds receiver → filter chain → sender, content hashing for
//! idempotency and instance sharing, reusable fragments, and the
//! storage-backend seam with its in-memory driver.

mod config;
mod error;
mod plugin_config;
mod storer;

pub use config::{DeliveryMode, RouteConfig};
pub use error::{Result, RouteError};
pub use plugin_config::PluginConfig;
pub use storer::{InMemoryRouteStorer, RouteStorer};
