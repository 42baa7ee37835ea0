//! Wire shapes for the admin console endpoints.
//!
//! Field names are camelCase to match what the SPA already consumes.

use serde::{Deserialize, Serialize};

use crate::services::directory::DirectoryUser;

/// Query parameters accepted by `GET /api/users`.
///
/// `pageSize` and `disabled` arrive as raw strings so malformed values can be
/// rejected with a 400 instead of axum's default deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page_size: Option<String>,
    pub page_token: Option<String>,
    pub email_contains: Option<String>,
    pub disabled: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sign_in_time: Option<String>,
}

/// One MFA enrollment on a user account. Order is preserved as the upstream
/// directory reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondFactor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedUser {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub disabled: bool,
    pub provider_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub second_factors: Vec<SecondFactor>,
    pub metadata: UserMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_claims: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<DirectoryUser> for ListedUser {
    fn from(user: DirectoryUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            phone_number: user.phone_number,
            display_name: user.display_name,
            disabled: user.disabled,
            provider_ids: user.provider_ids,
            second_factors: user.second_factors,
            metadata: UserMetadata {
                creation_time: user.creation_time,
                last_sign_in_time: user.last_sign_in_time,
            },
            custom_claims: user.custom_claims,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub users: Vec<ListedUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Number of records in this page.
    pub count: usize,
}

/// Body for `PATCH /api/users/role`. Fields are optional so missing values
/// surface as a validation error instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetRoleResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ListAppsResponse {
    pub apps: Vec<crate::services::apps::FirebaseWebApp>,
}
