//! AuthService handlers.

use axum::extract::State;
use axum::Json;
use gophkeeper_core::api::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshTokenRequest,
    RefreshTokenResponse, RegisterRequest, RegisterResponse,
};

use crate::error::ApiError;
use crate::server::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let user_id = state.auth.register(&req.login, &req.password)?;
    Ok(Json(RegisterResponse { user_id }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (pair, user_id) = state.auth.login(&req.login, &req.password)?;
    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user_id,
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    let pair = state.auth.refresh_tokens(&req.refresh_token)?;
    Ok(Json(RefreshTokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Server-side no-op: no refresh-token registry exists to revoke from.
/// The client discards its local tokens regardless.
pub async fn logout(Json(_req): Json<LogoutRequest>) -> Json<LogoutResponse> {
    Json(LogoutResponse { success: true })
}
