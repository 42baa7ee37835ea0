//! Web-app inventory endpoint.

use axum::{extract::State, Json};

use crate::dtos::ListAppsResponse;
use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::AppState;

/// `GET /api/apps` — registered Firebase web apps for the project.
pub async fn list_apps(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
) -> Result<Json<ListAppsResponse>, AppError> {
    tracing::info!(caller = %caller.uid, "Listing web apps");

    let apps = state.apps.list_web_apps().await?;
    Ok(Json(ListAppsResponse { apps }))
}
