use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// How many upstream pages one filtered listing request may scan before
/// returning a short page. See [`crate::services::users::UserService`].
pub const DEFAULT_MAX_SCAN_PAGES: usize = 20;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub firebase: FirebaseConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct FirebaseConfig {
    /// Google Cloud project that owns the Firebase Auth user pool.
    pub project_id: String,
    /// Path to the service-account key JSON used for upstream calls.
    pub service_account_path: PathBuf,
    /// Upper bound on upstream pages scanned per filtered listing request.
    pub max_scan_pages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("ADMIN_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("ADMIN_API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("ADMIN_API_PORT must be a valid port number")?;

        let project_id =
            env::var("FIREBASE_PROJECT_ID").context("FIREBASE_PROJECT_ID must be set")?;
        let service_account_path = env::var("FIREBASE_SERVICE_ACCOUNT_PATH")
            .unwrap_or_else(|_| "service-account.json".to_string())
            .into();

        let max_scan_pages = match env::var("ADMIN_API_MAX_SCAN_PAGES") {
            Ok(raw) => raw
                .parse()
                .context("ADMIN_API_MAX_SCAN_PAGES must be a positive integer")?,
            Err(_) => DEFAULT_MAX_SCAN_PAGES,
        };

        Ok(Self {
            server: ServerConfig { host, port },
            firebase: FirebaseConfig {
                project_id,
                service_account_path,
                max_scan_pages,
            },
            service_name: "admin-api".to_string(),
        })
    }
}
