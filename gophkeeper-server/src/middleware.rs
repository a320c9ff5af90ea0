//! Bearer-token auth middleware.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use gophkeeper_core::DomainError;

use crate::error::ApiError;
use crate::server::AppState;

/// Authenticated caller, published on request extensions for handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub login: String,
}

/// Runs before every non-public method: extracts the bearer token, resolves
/// the user, and publishes it on the request. Any failure collapses to
/// UNAUTHENTICATED.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(ApiError(DomainError::InvalidToken))?
        .to_string();

    let user = state
        .auth
        .validate_token(&token)
        .map_err(|e| match e {
            // Expiry stays distinguishable so clients can refresh.
            DomainError::TokenExpired => ApiError(DomainError::TokenExpired),
            _ => ApiError(DomainError::InvalidToken),
        })?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        login: user.login,
    });

    Ok(next.run(request).await)
}
