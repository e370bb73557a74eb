//! Fragment CRUD handlers

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use relay_route::PluginConfig;

use super::tenant_from_path;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST `/ears/v1/orgs/{orgId}/applications/{appId}/fragments`
#[instrument(skip(state, body), fields(org_id = %org_id, app_id = %app_id))]
pub async fn add_fragment(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<PluginConfig>> {
    add_fragment_inner(state, &org_id, &app_id, None, body).await
}

/// PUT `/ears/v1/orgs/{orgId}/applications/{appId}/fragments/{fragmentId}`
#[instrument(skip(state, body), fields(org_id = %org_id, app_id = %app_id, fragment_id = %fragment_id))]
pub async fn put_fragment(
    State(state): State<AppState>,
    Path((org_id, app_id, fragment_id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<PluginConfig>> {
    add_fragment_inner(state, &org_id, &app_id, Some(fragment_id), body).await
}

async fn add_fragment_inner(
    state: AppState,
    org_id: &str,
    app_id: &str,
    fragment_id: Option<String>,
    body: Value,
) -> Result<ApiResponse<PluginConfig>> {
    let tid = tenant_from_path(org_id, app_id)?;
    state.tenant_config(&tid).await?;

    let mut fragment: PluginConfig = serde_json::from_value(body)
        .map_err(|err| ApiError::bad_request(format!("cannot unmarshal request body: {}", err)))?;

    let name = match (fragment_id, fragment.fragment_name.clone()) {
        (Some(id), Some(name)) if id != name => {
            return Err(ApiError::bad_request(format!(
                "fragment name mismatch {} vs {}",
                id, name
            )));
        }
        (Some(id), _) => id,
        (None, Some(name)) if !name.is_empty() => name,
        _ => return Err(ApiError::bad_request("missing fragment name")),
    };
    fragment.fragment_name = Some(name.clone());

    state.manager.add_fragment(&tid, &name, fragment.clone()).await?;
    Ok(ApiResponse::item(fragment))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/fragments/{fragmentId}`
pub async fn get_fragment(
    State(state): State<AppState>,
    Path((org_id, app_id, fragment_id)): Path<(String, String, String)>,
) -> Result<ApiResponse<PluginConfig>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let fragment = state.manager.get_fragment(&tid, &fragment_id).await?;
    Ok(ApiResponse::item(fragment))
}

/// DELETE `/ears/v1/orgs/{orgId}/applications/{appId}/fragments/{fragmentId}`
#[instrument(skip(state), fields(org_id = %org_id, app_id = %app_id, fragment_id = %fragment_id))]
pub async fn remove_fragment(
    State(state): State<AppState>,
    Path((org_id, app_id, fragment_id)): Path<(String, String, String)>,
) -> Result<ApiResponse<String>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    state.manager.remove_fragment(&tid, &fragment_id).await?;
    Ok(ApiResponse::item(fragment_id))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/fragments`
pub async fn get_all_tenant_fragments(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<Vec<PluginConfig>>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    let fragments = state.manager.get_all_tenant_fragments(&tid).await?;
    Ok(ApiResponse::items(fragments))
}

/// GET `/ears/v1/fragments`
pub async fn get_all_fragments(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<PluginConfig>>> {
    let fragments = state.manager.get_all_fragments().await?;
    Ok(ApiResponse::items(fragments))
}
