//! Shared fixtures: an in-memory user directory, a canned token verifier,
//! and helpers for assembling the router under test.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use admin_api::config::{Config, FirebaseConfig, ServerConfig};
use admin_api::dtos::SecondFactor;
use admin_api::error::AppError;
use admin_api::services::directory::{
    DirectoryPage, DirectoryUser, TokenVerifier, UserDirectory, VerifiedCaller,
};
use admin_api::services::gauth::AccessTokenSource;
use admin_api::services::{UserService, WebAppsClient};
use admin_api::AppState;

pub fn user(uid: &str, email: Option<&str>, disabled: bool) -> DirectoryUser {
    DirectoryUser {
        uid: uid.to_string(),
        email: email.map(str::to_string),
        phone_number: None,
        display_name: None,
        disabled,
        provider_ids: vec!["password".to_string()],
        second_factors: Vec::<SecondFactor>::new(),
        creation_time: Some("2024-01-01T00:00:00Z".to_string()),
        last_sign_in_time: None,
        custom_claims: None,
    }
}

/// In-memory directory serving pages from a flat list. Page tokens are the
/// stringified index of the next record, which models an opaque upstream
/// cursor well enough for these tests.
pub struct FakeDirectory {
    users: Mutex<Vec<DirectoryUser>>,
    /// `max_results` of every `list_page` call, in order.
    pub requested_sizes: Mutex<Vec<usize>>,
    /// Claims maps written via `set_custom_claims`, in order.
    pub claim_writes: Mutex<Vec<(String, serde_json::Map<String, serde_json::Value>)>>,
}

impl FakeDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: Mutex::new(users),
            requested_sizes: Mutex::new(Vec::new()),
            claim_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.requested_sizes.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.claim_writes.lock().unwrap().len()
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn list_page(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<DirectoryPage, AppError> {
        self.requested_sizes.lock().unwrap().push(max_results);

        let users = self.users.lock().unwrap();
        let start: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| AppError::Upstream(anyhow::anyhow!("bad page token {}", token)))?,
            None => 0,
        };

        let end = (start + max_results).min(users.len());
        let page: Vec<DirectoryUser> = users[start.min(users.len())..end].to_vec();
        let next_page_token = (end < users.len()).then(|| end.to_string());

        Ok(DirectoryPage {
            users: page,
            next_page_token,
        })
    }

    async fn get_user(&self, uid: &str) -> Result<DirectoryUser, AppError> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.uid == uid)
            .cloned()
            .ok_or_else(|| AppError::Upstream(anyhow::anyhow!("user {} not found", uid)))
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AppError> {
        {
            let mut users = self.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|u| u.uid == uid)
                .ok_or_else(|| AppError::Upstream(anyhow::anyhow!("user {} not found", uid)))?;
            user.custom_claims = Some(claims.clone());
        }
        self.claim_writes
            .lock()
            .unwrap()
            .push((uid.to_string(), claims));
        Ok(())
    }
}

/// Verifier accepting two fixed tokens: `admin-token` maps to an admin
/// caller, `viewer-token` to a non-admin one.
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedCaller, AppError> {
        match id_token {
            "admin-token" => Ok(VerifiedCaller {
                uid: "admin-uid".to_string(),
                claims: json!({ "role": "Admin" }).as_object().cloned().unwrap(),
            }),
            "viewer-token" => Ok(VerifiedCaller {
                uid: "viewer-uid".to_string(),
                claims: json!({ "role": "Viewer" }).as_object().cloned().unwrap(),
            }),
            _ => Err(AppError::Unauthorized(
                "Invalid or expired token".to_string(),
            )),
        }
    }
}

/// Fixed bearer token for wiremock-backed clients.
pub struct StaticTokens(pub &'static str);

#[async_trait]
impl AccessTokenSource for StaticTokens {
    async fn access_token(&self) -> Result<String, AppError> {
        Ok(self.0.to_string())
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        firebase: FirebaseConfig {
            project_id: "chefu-test".to_string(),
            service_account_path: PathBuf::from("unused.json"),
            max_scan_pages: 20,
        },
        service_name: "admin-api".to_string(),
    }
}

/// AppState over the fake directory and verifier. The web-apps client points
/// at `apps_base_url` so individual tests can back it with wiremock.
pub fn test_state(directory: Arc<FakeDirectory>, apps_base_url: &str) -> AppState {
    let config = test_config();
    AppState {
        users: UserService::new(directory, config.firebase.max_scan_pages),
        apps: WebAppsClient::new(
            apps_base_url,
            config.firebase.project_id.as_str(),
            Arc::new(StaticTokens("test-access-token")),
        ),
        verifier: Arc::new(FakeVerifier),
        config,
    }
}
