//! Relay - API
//!
//! The HTTP control plane, rooted at `/ears/v1`.
//!
//! # Endpoints
//!
//! Tenant-scoped, under `/ears/v1/orgs/{orgId}/applications/{appId}`:
//! - `routes` POST, GET; `routes/{routeId}` PUT, GET, DELETE
//! - `routes/{routeId}/event` POST - submit an event to a route
//! - `fragments` POST, GET; `fragments/{fragmentId}` PUT, GET, DELETE
//! - `config` GET, PUT, DELETE - tenant configuration
//! - `senders`, `receivers`, `filters` GET - plugin status
//!
//! Global:
//! - `/ears/v1/routes`, `/ears/v1/tenants`, `/ears/v1/fragments`
//! - `/ears/v1/senders`, `/ears/v1/receivers`, `/ears/v1/filters`
//! - `/ears/v1/events` POST - webhook alias onto a configured route
//! - `/ears/version`
//!
//! Errors map onto status codes: bad configuration and validation → 400,
//! missing routes/tenants/fragments → 404, storage and internal faults → 500.

mod error;
mod routes;
mod state;
mod types;

pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use types::ApiResponse;
