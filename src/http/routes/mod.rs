pub mod access;
pub mod auth;
pub mod doctors;
pub mod notifications;
pub mod records;

use axum::Json;

use super::{ApiError, ApiResult};

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Parse a numeric path segment, or reject with `message`.
fn parse_id(raw: &str, message: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(message))
}
