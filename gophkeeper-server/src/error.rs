//! Mapping of domain errors to transport codes at the RPC boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gophkeeper_core::api::ErrorBody;
use gophkeeper_core::DomainError;

/// Response-side wrapper around a domain error.
///
/// Every non-2xx body is `{"code": "...", "message": "..."}`; unmapped
/// errors collapse to INTERNAL without leaking SQL text or backtraces.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            DomainError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                "user already exists".to_string(),
            ),
            DomainError::SecretAlreadyExists => (
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                "secret already exists".to_string(),
            ),
            DomainError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "user not found".to_string(),
            ),
            DomainError::SecretNotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "secret not found".to_string(),
            ),
            DomainError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "invalid credentials".to_string(),
            ),
            DomainError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "invalid token".to_string(),
            ),
            DomainError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "token expired".to_string(),
            ),
            DomainError::AccessDenied => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "access denied".to_string(),
            ),
            DomainError::VersionConflict => (
                StatusCode::PRECONDITION_FAILED,
                "FAILED_PRECONDITION",
                "version conflict".to_string(),
            ),
            DomainError::InvalidSecret(ve) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                ve.to_string(),
            ),
            DomainError::InvalidSecretType => (
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                "invalid secret type".to_string(),
            ),
            DomainError::Validation(ve) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                ve.to_string(),
            ),
            DomainError::Storage(detail) | DomainError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gophkeeper_core::ValidationError;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        assert_eq!(status_of(DomainError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::SecretNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(DomainError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(DomainError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(DomainError::VersionConflict),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status_of(DomainError::InvalidSecret(ValidationError::new(
                "name",
                "is required"
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_detail_never_reaches_the_body() {
        let response =
            ApiError(DomainError::Storage("UNIQUE constraint failed".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
