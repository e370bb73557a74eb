//! Route CRUD handlers

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use relay_route::RouteConfig;

use super::tenant_from_path;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST `/ears/v1/orgs/{orgId}/applications/{appId}/routes`
#[instrument(skip(state, body), fields(org_id = %org_id, app_id = %app_id))]
pub async fn add_route(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RouteConfig>> {
    add_route_inner(state, &org_id, &app_id, None, body).await
}

/// PUT `/ears/v1/orgs/{orgId}/applications/{appId}/routes/{routeId}`
#[instrument(skip(state, body), fields(org_id = %org_id, app_id = %app_id, route_id = %route_id))]
pub async fn put_route(
    State(state): State<AppState>,
    Path((org_id, app_id, route_id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RouteConfig>> {
    add_route_inner(state, &org_id, &app_id, Some(route_id), body).await
}

async fn add_route_inner(
    state: AppState,
    org_id: &str,
    app_id: &str,
    route_id: Option<String>,
    body: Value,
) -> Result<ApiResponse<RouteConfig>> {
    let tid = tenant_from_path(org_id, app_id)?;
    state.tenant_config(&tid).await?;

    let mut config: RouteConfig = serde_json::from_value(body)
        .map_err(|err| ApiError::bad_request(format!("cannot unmarshal request body: {}", err)))?;

    if let Some(route_id) = route_id {
        if !config.id.is_empty() && config.id != route_id {
            return Err(ApiError::bad_request(format!(
                "route ID mismatch {} vs {}",
                route_id, config.id
            )));
        }
        config.id = route_id;
    }
    config.org_id = tid.org_id.clone();
    config.app_id = tid.app_id.clone();

    let stored = state.manager.add_route(config).await?;
    Ok(ApiResponse::item(stored))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/routes/{routeId}`
pub async fn get_route(
    State(state): State<AppState>,
    Path((org_id, app_id, route_id)): Path<(String, String, String)>,
) -> Result<ApiResponse<RouteConfig>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let config = state.manager.get_route(&tid, &route_id).await?;
    Ok(ApiResponse::item(config))
}

/// DELETE `/ears/v1/orgs/{orgId}/applications/{appId}/routes/{routeId}`
#[instrument(skip(state), fields(org_id = %org_id, app_id = %app_id, route_id = %route_id))]
pub async fn remove_route(
    State(state): State<AppState>,
    Path((org_id, app_id, route_id)): Path<(String, String, String)>,
) -> Result<ApiResponse<String>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    state.manager.remove_route(&tid, &route_id).await?;
    Ok(ApiResponse::item(route_id))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/routes`
pub async fn get_all_tenant_routes(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<Vec<RouteConfig>>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let configs = state.manager.get_all_tenant_routes(&tid).await?;
    Ok(ApiResponse::items(configs))
}

/// GET `/ears/v1/routes`
pub async fn get_all_routes(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RouteConfig>>> {
    let configs = state.manager.get_all_routes().await?;
    Ok(ApiResponse::items(configs))
}
