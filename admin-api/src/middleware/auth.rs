use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::services::directory::VerifiedCaller;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn is_admin(caller: &VerifiedCaller) -> bool {
    if caller.claims.get("admin") == Some(&serde_json::Value::Bool(true)) {
        return true;
    }
    match caller.claims.get("role").and_then(|v| v.as_str()) {
        Some(role) => {
            let role = role.to_lowercase();
            role == "admin" || role == "owner"
        }
        None => false,
    }
}

/// Middleware gating the admin endpoints: requires a bearer ID token that
/// introspects to an account holding admin claims.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let token = match token {
        Some(token) => token.to_string(),
        None => {
            return Err(AppError::Unauthorized("Missing bearer token".to_string()));
        }
    };

    let caller = state.verifier.verify(&token).await?;

    if !is_admin(&caller) {
        tracing::warn!(uid = %caller.uid, "Non-admin caller rejected");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    // Handlers read the caller from request extensions.
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

/// Extractor for the verified admin caller placed by the middleware.
pub struct AdminUser(pub VerifiedCaller);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<VerifiedCaller>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Caller identity missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AdminUser(caller.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caller(claims: serde_json::Value) -> VerifiedCaller {
        VerifiedCaller {
            uid: "u1".to_string(),
            claims: claims.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn admin_flag_grants_access() {
        assert!(is_admin(&caller(json!({ "admin": true }))));
        assert!(!is_admin(&caller(json!({ "admin": false }))));
    }

    #[test]
    fn admin_and_owner_roles_grant_access() {
        assert!(is_admin(&caller(json!({ "role": "Admin" }))));
        assert!(is_admin(&caller(json!({ "role": "owner" }))));
        assert!(!is_admin(&caller(json!({ "role": "Editor" }))));
        assert!(!is_admin(&caller(json!({}))));
    }
}
