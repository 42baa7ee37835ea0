//! Service-account OAuth2 for Google APIs.
//!
//! Signs an RS256 JWT assertion with the service-account key and trades it
//! for a short-lived access token at the account's token endpoint. Tokens are
//! cached until shortly before expiry so concurrent requests share one grant.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Anything that can hand out a Google API bearer token.
///
/// Production uses [`TokenProvider`]; tests substitute a fixed string.
#[async_trait::async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AppError>;
}

const SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/firebase";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the upstream expiry to avoid racing it.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: Secret<String>,
    token_uri: String,
    project_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: Secret<String>,
    expires_at: DateTime<Utc>,
}

/// Mints and caches Google API access tokens for one service account.
#[derive(Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    client_email: String,
    token_uri: String,
    encoding_key: Arc<EncodingKey>,
    cached: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenProvider {
    /// Load the service-account key from disk and prepare the signer.
    pub fn from_key_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading service-account key {}", path.display()))
            .map_err(AppError::Config)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .context("parsing service-account key JSON")
            .map_err(AppError::Config)?;

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
            .context("service-account private_key is not a valid RSA PEM")
            .map_err(AppError::Config)?;

        if let Some(project) = &key.project_id {
            tracing::info!(project_id = %project, client_email = %key.client_email, "Service account loaded");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            client_email: key.client_email,
            token_uri: key.token_uri,
            encoding_key: Arc::new(encoding_key),
            cached: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken, AppError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("signing OAuth assertion")
            .map_err(AppError::Internal)?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Upstream(anyhow!(
                "token endpoint returned {}: {}",
                status,
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .context("parsing token endpoint response")
            .map_err(AppError::Upstream)?;

        tracing::debug!(expires_in = token.expires_in, "Access token refreshed");

        Ok(CachedToken {
            access_token: Secret::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for TokenProvider {
    /// Return a bearer token, reusing the cached one while it is still fresh.
    async fn access_token(&self) -> Result<String, AppError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.access_token.expose_secret().clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.expose_secret().clone());
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.expose_secret().clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
