//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use relay_tablemgr::TableError;
use relay_tenant::TenantError;

/// Result type for API handlers
pub type Result<T> = std::result::Result<T, ApiError>;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request: bad ids, bad body, bad route config
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication or authorization failure
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Route, tenant, or fragment not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a BadRequest error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a NotFound error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::BadConfig(msg) => Self::BadRequest(format!("bad route config: {}", msg)),
            TableError::Validation(msg) => Self::BadRequest(format!("bad route config: {}", msg)),
            TableError::Registration(msg) => Self::BadRequest(format!("bad route config: {}", msg)),
            TableError::NotFound(what) => Self::NotFound(what),
            TableError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::InvalidId { .. } => Self::BadRequest(err.to_string()),
            TenantError::NotFound { key } => Self::NotFound(format!("tenant '{}'", key)),
            TenantError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "status": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
