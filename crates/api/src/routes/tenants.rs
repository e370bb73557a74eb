//! Tenant configuration handlers

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use relay_tenant::{TenantConfig, TenantId};

use super::tenant_from_path;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/config`
pub async fn get_tenant_config(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<TenantConfig>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let config = state.tenants.get_config(&tid).await?;
    Ok(ApiResponse::item(config))
}

/// PUT `/ears/v1/orgs/{orgId}/applications/{appId}/config`
#[instrument(skip(state, body), fields(org_id = %org_id, app_id = %app_id))]
pub async fn set_tenant_config(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<TenantConfig>> {
    let tid = tenant_from_path(&org_id, &app_id)?;

    let mut config: TenantConfig = if body.is_null() {
        TenantConfig::new(tid.clone())
    } else {
        let mut body = body;
        if let Value::Object(map) = &mut body {
            // The path is authoritative for identity.
            map.insert("tenant".to_string(), serde_json::to_value(&tid).unwrap_or(Value::Null));
        }
        serde_json::from_value(body).map_err(|err| {
            ApiError::bad_request(format!("cannot unmarshal request body: {}", err))
        })?
    };
    config.tenant = tid.clone();

    state.tenants.set_config(config.clone()).await?;
    state.tenant_cache.invalidate(&tid);
    Ok(ApiResponse::item(config))
}

/// DELETE `/ears/v1/orgs/{orgId}/applications/{appId}/config`
///
/// Refused while the tenant still has routes.
#[instrument(skip(state), fields(org_id = %org_id, app_id = %app_id))]
pub async fn delete_tenant_config(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<TenantId>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let routes = state.manager.get_all_tenant_routes(&tid).await?;
    if !routes.is_empty() {
        return Err(ApiError::bad_request("tenant has routes"));
    }
    state.tenants.delete_config(&tid).await?;
    state.tenant_cache.invalidate(&tid);
    Ok(ApiResponse::item(tid))
}

/// GET `/ears/v1/tenants`
pub async fn get_all_tenant_configs(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<TenantConfig>>> {
    let configs = state.tenants.get_all_configs().await?;
    Ok(ApiResponse::items(configs))
}
