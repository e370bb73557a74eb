//! Plugin status handlers

use std::collections::HashMap;

use axum::extract::{Path, State};

use relay_tablemgr::PluginStatus;
use relay_tenant::TenantId;

use super::tenant_from_path;
use crate::error::Result;
use crate::state::AppState;
use crate::types::ApiResponse;

fn scoped(
    all: HashMap<String, PluginStatus>,
    tid: &TenantId,
) -> HashMap<String, PluginStatus> {
    all.into_iter()
        .filter(|(_, status)| &status.tenant == tid)
        .collect()
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/senders`
pub async fn tenant_senders(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    Ok(ApiResponse::items(scoped(state.manager.get_all_senders_status(), &tid)))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/receivers`
pub async fn tenant_receivers(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    Ok(ApiResponse::items(scoped(state.manager.get_all_receivers_status(), &tid)))
}

/// GET `/ears/v1/orgs/{orgId}/applications/{appId}/filters`
pub async fn tenant_filters(
    State(state): State<AppState>,
    Path((org_id, app_id)): Path<(String, String)>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    Ok(ApiResponse::items(scoped(state.manager.get_all_filters_status(), &tid)))
}

/// GET `/ears/v1/senders`
pub async fn all_senders(
    State(state): State<AppState>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    Ok(ApiResponse::items(state.manager.get_all_senders_status()))
}

/// GET `/ears/v1/receivers`
pub async fn all_receivers(
    State(state): State<AppState>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    Ok(ApiResponse::items(state.manager.get_all_receivers_status()))
}

/// GET `/ears/v1/filters`
pub async fn all_filters(
    State(state): State<AppState>,
) -> Result<ApiResponse<HashMap<String, PluginStatus>>> {
    Ok(ApiResponse::items(state.manager.get_all_filters_status()))
}
