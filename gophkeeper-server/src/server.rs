//! Router setup and shared application state.

use axum::routing::{get, post};
use axum::Router;
use gophkeeper_core::{PasswordHasher, TokenManager};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{auth, secrets};
use crate::middleware::auth_middleware;
use crate::service::{AuthService, DataService};
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub data: Arc<DataService>,
}

impl AppState {
    pub fn new(storage: Storage, config: &ServerConfig) -> Self {
        let tokens = TokenManager::new(
            &config.jwt_secret,
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        );
        Self {
            auth: Arc::new(AuthService::new(
                storage.clone(),
                tokens,
                PasswordHasher::default(),
            )),
            data: Arc::new(DataService::new(storage)),
        }
    }
}

/// Route paths carry the RPC method names bit-exact; only Register and
/// Login bypass the auth middleware.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let authenticated = Router::new()
        .route("/gophkeeper.v1.AuthService/Logout", post(auth::logout))
        .route("/gophkeeper.v1.SecretService/Sync", post(secrets::sync))
        .route(
            "/gophkeeper.v1.SecretService/GetSecret",
            post(secrets::get_secret),
        )
        .route(
            "/gophkeeper.v1.SecretService/ListSecrets",
            post(secrets::list_secrets),
        )
        .route(
            "/gophkeeper.v1.SecretService/UpdateSecret",
            post(secrets::update_secret),
        )
        .route(
            "/gophkeeper.v1.SecretService/DeleteSecret",
            post(secrets::delete_secret),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // RefreshToken is reachable with an expired access token: it
    // authenticates by the refresh token in its body.
    let public = Router::new()
        .route("/gophkeeper.v1.AuthService/Register", post(auth::register))
        .route("/gophkeeper.v1.AuthService/Login", post(auth::login))
        .route(
            "/gophkeeper.v1.AuthService/RefreshToken",
            post(auth::refresh_token),
        )
        .route("/health", get(health));

    Router::new()
        .merge(authenticated)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
