//! Firebase Auth (Google Identity Toolkit) REST client.
//!
//! Implements the [`UserDirectory`] seam over
//! `identitytoolkit.googleapis.com`: `accounts:batchGet` for paging,
//! `accounts:lookup` for single-user reads and ID-token introspection, and
//! `accounts:update` for custom-claims writes.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::dtos::SecondFactor;
use crate::error::AppError;
use crate::services::directory::{
    DirectoryPage, DirectoryUser, TokenVerifier, UserDirectory, VerifiedCaller,
};
use crate::services::gauth::AccessTokenSource;

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// One account as the Identity Toolkit wire format reports it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    local_id: String,
    email: Option<String>,
    phone_number: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    provider_user_info: Vec<ApiProviderInfo>,
    #[serde(default)]
    mfa_info: Vec<ApiMfaEnrollment>,
    /// Epoch milliseconds, as a decimal string.
    created_at: Option<String>,
    last_login_at: Option<String>,
    /// Custom claims as a serialized JSON object.
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProviderInfo {
    provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMfaEnrollment {
    mfa_enrollment_id: Option<String>,
    display_name: Option<String>,
    phone_info: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<ApiUser>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<ApiUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    custom_attributes: String,
}

fn millis_to_rfc3339(raw: &str) -> Option<String> {
    let millis: i64 = raw.parse().ok()?;
    let ts = DateTime::from_timestamp_millis(millis)?;
    Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl From<ApiUser> for DirectoryUser {
    fn from(user: ApiUser) -> Self {
        let custom_claims = user.custom_attributes.as_deref().and_then(|raw| {
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw).ok()
        });

        Self {
            uid: user.local_id,
            email: user.email,
            phone_number: user.phone_number,
            display_name: user.display_name,
            disabled: user.disabled,
            provider_ids: user
                .provider_user_info
                .into_iter()
                .filter_map(|p| p.provider_id)
                .collect(),
            second_factors: user
                .mfa_info
                .into_iter()
                .map(|m| SecondFactor {
                    enrollment_id: m.mfa_enrollment_id,
                    display_name: m.display_name,
                    factor_id: m.phone_info.map(|_| "phone".to_string()),
                })
                .collect(),
            creation_time: user.created_at.as_deref().and_then(millis_to_rfc3339),
            last_sign_in_time: user.last_login_at.as_deref().and_then(millis_to_rfc3339),
            custom_claims,
        }
    }
}

/// Firebase Auth client for one project.
#[derive(Clone)]
pub struct FirebaseDirectory {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl FirebaseDirectory {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            tokens,
        }
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/accounts:{}",
            self.base_url, self.project_id, method
        )
    }

    async fn lookup(&self, body: serde_json::Value) -> Result<LookupResponse, AppError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(self.accounts_url("lookup"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Upstream(anyhow!(
                "accounts:lookup returned {}: {}",
                status,
                body
            )));
        }

        serde_json::from_str(&body)
            .context("parsing accounts:lookup response")
            .map_err(AppError::Upstream)
    }
}

#[async_trait]
impl UserDirectory for FirebaseDirectory {
    async fn list_page(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<DirectoryPage, AppError> {
        let token = self.tokens.access_token().await?;

        let mut request = self
            .client
            .get(self.accounts_url("batchGet"))
            .bearer_auth(token)
            .query(&[("maxResults", max_results.to_string())]);
        if let Some(page_token) = page_token {
            request = request.query(&[("nextPageToken", page_token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, max_results, "accounts:batchGet response");

        if !status.is_success() {
            return Err(AppError::Upstream(anyhow!(
                "accounts:batchGet returned {}: {}",
                status,
                body
            )));
        }

        let page: BatchGetResponse = serde_json::from_str(&body)
            .context("parsing accounts:batchGet response")
            .map_err(AppError::Upstream)?;

        Ok(DirectoryPage {
            users: page.users.into_iter().map(DirectoryUser::from).collect(),
            next_page_token: page.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_user(&self, uid: &str) -> Result<DirectoryUser, AppError> {
        let result = self.lookup(json!({ "localId": [uid] })).await?;
        let user = result
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Upstream(anyhow!("user {} not found upstream", uid)))?;
        Ok(user.into())
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AppError> {
        let token = self.tokens.access_token().await?;
        let request = UpdateRequest {
            local_id: uid,
            custom_attributes: serde_json::Value::Object(claims).to_string(),
        };

        let response = self
            .client
            .post(self.accounts_url("update"))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(AppError::Upstream(anyhow!(
                "accounts:update returned {}: {}",
                status,
                body
            )));
        }

        tracing::info!(uid = %uid, "Custom claims updated");
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for FirebaseDirectory {
    /// Introspect a caller ID token against the directory. Invalid or expired
    /// tokens come back as `Unauthorized`, never `Upstream`.
    async fn verify(&self, id_token: &str) -> Result<VerifiedCaller, AppError> {
        let result = match self.lookup(json!({ "idToken": id_token })).await {
            Ok(result) => result,
            Err(AppError::Upstream(err)) => {
                tracing::debug!(error = %err, "ID token rejected upstream");
                return Err(AppError::Unauthorized(
                    "Invalid or expired token".to_string(),
                ));
            }
            Err(err) => return Err(err),
        };

        let user = result.users.into_iter().next().ok_or_else(|| {
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if user.disabled {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let user: DirectoryUser = user.into();
        Ok(VerifiedCaller {
            uid: user.uid,
            claims: user.custom_claims.unwrap_or_default(),
        })
    }
}
