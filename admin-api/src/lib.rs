pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::{admin_auth_middleware, request_id_middleware};
use services::directory::{TokenVerifier, UserDirectory};
use services::{FirebaseDirectory, TokenProvider, UserService, WebAppsClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: UserService,
    pub apps: WebAppsClient,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Assemble the full router for a given state. Split out so tests can drive
/// the service without binding a listener.
pub fn app_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/role", patch(handlers::users::set_role))
        .route("/api/apps", get(handlers::apps::list_apps))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenProvider::from_key_file(
            &config.firebase.service_account_path,
        )?);

        let directory = FirebaseDirectory::new(
            services::firebase::DEFAULT_BASE_URL,
            config.firebase.project_id.as_str(),
            tokens.clone(),
        );
        let verifier: Arc<dyn TokenVerifier> = Arc::new(directory.clone());
        let directory: Arc<dyn UserDirectory> = Arc::new(directory);

        let users = UserService::new(directory, config.firebase.max_scan_pages);
        let apps = WebAppsClient::new(
            services::apps::DEFAULT_BASE_URL,
            config.firebase.project_id.as_str(),
            tokens,
        );

        tracing::info!(
            project_id = %config.firebase.project_id,
            max_scan_pages = config.firebase.max_scan_pages,
            "Firebase clients initialized"
        );

        let state = AppState {
            config: config.clone(),
            users,
            apps,
            verifier,
        };

        Ok(Self {
            port: config.server.port,
            router: app_router(state),
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
