//! User listing and role endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::dtos::{ListUsersQuery, ListUsersResponse, SetRoleRequest, SetRoleResponse};
use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::services::users::{ListUsersParams, Role};
use crate::AppState;

fn parse_params(query: ListUsersQuery) -> Result<ListUsersParams, AppError> {
    let page_size = match query.page_size.as_deref() {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            AppError::Validation(format!("pageSize must be an integer, got {:?}", raw))
        })?),
        None => None,
    };

    let disabled = match query.disabled.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            return Err(AppError::Validation(format!(
                "disabled must be \"true\" or \"false\", got {:?}",
                other
            )));
        }
        None => None,
    };

    Ok(ListUsersParams {
        page_size,
        page_token: query.page_token,
        email_contains: query.email_contains,
        disabled,
    })
}

/// `GET /api/users` — one page of users, optionally filtered.
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let params = parse_params(query)?;

    tracing::info!(
        caller = %caller.uid,
        page_size = ?params.page_size,
        email_contains = ?params.email_contains,
        disabled = ?params.disabled,
        "Listing users"
    );

    let response = state.users.list_users(params).await?;
    Ok(Json(response))
}

/// `PATCH /api/users/role` — assign a role tier to one user.
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<SetRoleResponse>, AppError> {
    let uid = payload
        .uid
        .as_deref()
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| AppError::Validation("uid is required".to_string()))?;
    let role: Role = payload
        .role
        .as_deref()
        .ok_or_else(|| AppError::Validation("role is required".to_string()))?
        .parse()?;

    tracing::info!(caller = %caller.uid, uid = %uid, role = ?role, "Setting role");

    state.users.set_role(uid, role).await?;
    Ok(Json(SetRoleResponse { ok: true }))
}
