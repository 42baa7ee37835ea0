//! HTTP handlers for admin-api.

pub mod apps;
pub mod users;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "admin-api" })),
    )
}
