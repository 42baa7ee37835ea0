//! Firebase web-app inventory via the Firebase Management API.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::gauth::AccessTokenSource;

pub const DEFAULT_BASE_URL: &str = "https://firebase.googleapis.com/v1beta1";

/// One registered web app. Every field is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseWebApp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListWebAppsResponse {
    #[serde(default)]
    apps: Vec<FirebaseWebApp>,
}

#[derive(Clone)]
pub struct WebAppsClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl WebAppsClient {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            tokens,
        }
    }

    pub async fn list_web_apps(&self) -> Result<Vec<FirebaseWebApp>, AppError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/projects/{}/webApps", self.base_url, self.project_id);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Upstream(anyhow!(
                "webApps list returned {}: {}",
                status,
                body
            )));
        }

        let listing: ListWebAppsResponse = serde_json::from_str(&body)
            .context("parsing webApps list response")
            .map_err(AppError::Upstream)?;

        tracing::debug!(count = listing.apps.len(), "Fetched web apps");
        Ok(listing.apps)
    }
}
