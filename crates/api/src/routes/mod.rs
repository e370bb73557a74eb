//! Control plane routes

mod events;
mod fragments;
mod routing;
mod status;
mod tenants;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::json;

use relay_tenant::TenantId;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// Build the complete control plane router.
pub fn build_router(state: AppState) -> Router {
    let tenant_prefix = "/ears/v1/orgs/{orgId}/applications/{appId}";
    Router::new()
        .route("/ears/version", get(version))
        // Routes
        .route(
            &format!("{tenant_prefix}/routes"),
            post(routing::add_route).get(routing::get_all_tenant_routes),
        )
        .route(
            &format!("{tenant_prefix}/routes/{{routeId}}"),
            put(routing::put_route)
                .get(routing::get_route)
                .delete(routing::remove_route),
        )
        .route(
            &format!("{tenant_prefix}/routes/{{routeId}}/event"),
            post(events::send_event),
        )
        // Fragments
        .route(
            &format!("{tenant_prefix}/fragments"),
            post(fragments::add_fragment).get(fragments::get_all_tenant_fragments),
        )
        .route(
            &format!("{tenant_prefix}/fragments/{{fragmentId}}"),
            put(fragments::put_fragment)
                .get(fragments::get_fragment)
                .delete(fragments::remove_fragment),
        )
        // Tenant configuration
        .route(
            &format!("{tenant_prefix}/config"),
            get(tenants::get_tenant_config)
                .put(tenants::set_tenant_config)
                .delete(tenants::delete_tenant_config),
        )
        // Tenant-scoped plugin status
        .route(&format!("{tenant_prefix}/senders"), get(status::tenant_senders))
        .route(&format!("{tenant_prefix}/receivers"), get(status::tenant_receivers))
        .route(&format!("{tenant_prefix}/filters"), get(status::tenant_filters))
        // Global surfaces
        .route("/ears/v1/routes", get(routing::get_all_routes))
        .route("/ears/v1/tenants", get(tenants::get_all_tenant_configs))
        .route("/ears/v1/fragments", get(fragments::get_all_fragments))
        .route("/ears/v1/senders", get(status::all_senders))
        .route("/ears/v1/receivers", get(status::all_receivers))
        .route("/ears/v1/filters", get(status::all_filters))
        .route("/ears/v1/events", post(events::webhook))
        .with_state(state)
}

/// Validate path ids into a tenant identity.
fn tenant_from_path(org_id: &str, app_id: &str) -> Result<TenantId> {
    TenantId::new(org_id, app_id).map_err(|err| ApiError::bad_request(err.to_string()))
}

async fn version(State(_state): State<AppState>) -> ApiResponse<serde_json::Value> {
    ApiResponse::item(json!({"version": env!("CARGO_PKG_VERSION")}))
}
