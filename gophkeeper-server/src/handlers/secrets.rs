//! SecretService handlers.
//!
//! Every handler resolves the caller from the auth middleware's request
//! extension; request fields naming a user are checked against it.

use axum::extract::State;
use axum::http::Extensions;
use axum::Json;
use gophkeeper_core::api::{
    DeleteSecretRequest, DeleteSecretResponse, GetSecretRequest, GetSecretResponse,
    ListSecretsRequest, ListSecretsResponse, SyncRequest, SyncResponse, UpdateSecretRequest,
    UpdateSecretResponse,
};
use gophkeeper_core::DomainError;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::server::AppState;

fn caller(extensions: &Extensions) -> Result<AuthUser, ApiError> {
    extensions
        .get::<AuthUser>()
        .cloned()
        .ok_or(ApiError(DomainError::InvalidToken))
}

pub async fn sync(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let user = caller(&extensions)?;
    if !req.user_id.is_empty() && req.user_id != user.id {
        return Err(ApiError(DomainError::AccessDenied));
    }

    let outcome = state
        .data
        .sync(&user.id, req.secrets, req.last_sync_version)?;

    tracing::debug!(
        user_id = %user.id,
        downloads = outcome.server_secrets.len(),
        conflicts = outcome.conflicts.len(),
        "sync round complete"
    );

    Ok(Json(SyncResponse {
        current_version: outcome.current_version,
        secrets: outcome.server_secrets,
        conflicts: outcome.conflicts,
    }))
}

pub async fn get_secret(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(req): Json<GetSecretRequest>,
) -> Result<Json<GetSecretResponse>, ApiError> {
    let user = caller(&extensions)?;
    let secret = state.data.get_secret(&user.id, &req.secret_id)?;
    Ok(Json(GetSecretResponse { secret }))
}

pub async fn list_secrets(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(req): Json<ListSecretsRequest>,
) -> Result<Json<ListSecretsResponse>, ApiError> {
    let user = caller(&extensions)?;
    if !req.user_id.is_empty() && req.user_id != user.id {
        return Err(ApiError(DomainError::AccessDenied));
    }

    let secrets = state.data.list_secrets(&user.id, req.filter_type)?;
    Ok(Json(ListSecretsResponse { secrets }))
}

pub async fn update_secret(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(req): Json<UpdateSecretRequest>,
) -> Result<Json<UpdateSecretResponse>, ApiError> {
    let user = caller(&extensions)?;
    let secret = state.data.update_secret(&user.id, req.secret)?;
    Ok(Json(UpdateSecretResponse { secret }))
}

pub async fn delete_secret(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(req): Json<DeleteSecretRequest>,
) -> Result<Json<DeleteSecretResponse>, ApiError> {
    let user = caller(&extensions)?;
    state.data.delete_secret(&user.id, &req.secret_id)?;
    Ok(Json(DeleteSecretResponse { success: true }))
}
