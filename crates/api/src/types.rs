//! Response envelope
//!
//! Every successful response carries `status.code` plus either `item` or
//! `items`, so clients can treat single and list results uniformly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Success envelope
#[derive(Debug)]
pub enum ApiResponse<T: Serialize> {
    /// A single result under `item`
    Item(T),
    /// A list result under `items`
    Items(T),
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a single result.
    pub fn item(value: T) -> Self {
        Self::Item(value)
    }

    /// Wrap a list result.
    pub fn items(value: T) -> Self {
        Self::Items(value)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = json!({"code": StatusCode::OK.as_u16()});
        let body = match self {
            Self::Item(value) => json!({"status": status, "item": value}),
            Self::Items(value) => json!({"status": status, "items": value}),
        };
        Json(body).into_response()
    }
}
