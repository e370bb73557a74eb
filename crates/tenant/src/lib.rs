//! Relay - Tenant
//!
//! Tenant identity and per-tenant configuration.
//!
//! Every route, fragment, and plugin instance in the gateway is scoped to a
//! tenant `(org_id, app_id)`. This crate owns the id type, its validation
//! rules, the tenant configuration record, the storage seam, and a small
//! read-through cache used by the HTTP surface.

mod cache;
mod config;
mod error;
mod id;
mod storer;

pub use cache::TenantCache;
pub use config::TenantConfig;
pub use error::{Result, TenantError};
pub use id::TenantId;
pub use storer::{InMemoryTenantStorer, TenantStorer};
