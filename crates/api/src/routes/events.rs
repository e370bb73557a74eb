//! Event submission handlers

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::instrument;

use relay_tenant::TenantId;

use super::tenant_from_path;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST `/ears/v1/orgs/{orgId}/applications/{appId}/routes/{routeId}/event`
#[instrument(skip(state, payload), fields(org_id = %org_id, app_id = %app_id, route_id = %route_id))]
pub async fn send_event(
    State(state): State<AppState>,
    Path((org_id, app_id, route_id)): Path<(String, String, String)>,
    Json(payload): Json<Value>,
) -> Result<ApiResponse<Value>> {
    let tid = tenant_from_path(&org_id, &app_id)?;
    submit(&state, &tid, &route_id, payload).await
}

/// POST `/ears/v1/events` - the global webhook alias.
///
/// Behaves exactly like a route-event POST against the configured
/// `(org, app, routeId)`.
#[instrument(skip(state, payload))]
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<ApiResponse<Value>> {
    let webhook = state
        .webhook
        .clone()
        .ok_or_else(|| ApiError::internal("no global webhook configured"))?;
    let tid = tenant_from_path(&webhook.org, &webhook.app)?;
    submit(&state, &tid, &webhook.route_id, payload).await
}

async fn submit(
    state: &AppState,
    tid: &TenantId,
    route_id: &str,
    payload: Value,
) -> Result<ApiResponse<Value>> {
    state.tenant_config(tid).await?;
    state.manager.get_route(tid, route_id).await?;
    let trace_id = state.manager.route_event(tid, route_id, payload).await?;
    Ok(ApiResponse::item(json!({
        "routeId": route_id,
        "tx.traceId": trace_id,
    })))
}
