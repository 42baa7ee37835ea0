//! Abstraction over the upstream user directory (Firebase Auth).
//!
//! The directory only supports size-bounded cursor pagination with no
//! server-side filter predicate; everything richer is layered on top in
//! [`crate::services::users`].

use async_trait::async_trait;

use crate::dtos::SecondFactor;
use crate::error::AppError;

/// One user record as reported by the upstream directory.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub uid: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub disabled: bool,
    pub provider_ids: Vec<String>,
    pub second_factors: Vec<SecondFactor>,
    /// RFC 3339 timestamps, when the directory reports them.
    pub creation_time: Option<String>,
    pub last_sign_in_time: Option<String>,
    pub custom_claims: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One upstream page plus the directory's own continuation token.
#[derive(Debug, Clone)]
pub struct DirectoryPage {
    pub users: Vec<DirectoryUser>,
    pub next_page_token: Option<String>,
}

/// Caller identity established from a bearer token.
#[derive(Debug, Clone)]
pub struct VerifiedCaller {
    pub uid: String,
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Validates caller-supplied ID tokens against the identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedCaller, AppError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one page of users starting at `page_token` (`None` = beginning).
    /// `max_results` is the upstream page size, already clamped by the caller.
    async fn list_page(
        &self,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<DirectoryPage, AppError>;

    /// Fetch a single user by uid.
    async fn get_user(&self, uid: &str) -> Result<DirectoryUser, AppError>;

    /// Replace the user's custom-claims map wholesale.
    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AppError>;
}
