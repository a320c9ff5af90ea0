//! Domain types and the error taxonomy shared by server and client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of secret a record holds.
///
/// Serialized with the wire enum names; the `Unspecified` variant exists
/// only so malformed clients can be rejected with a precise error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretType {
    #[serde(rename = "UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "LOGIN_PASSWORD")]
    LoginPassword,
    #[serde(rename = "TEXT_DATA")]
    Text,
    #[serde(rename = "BINARY_DATA")]
    Binary,
    #[serde(rename = "BANK_CARD")]
    BankCard,
}

impl SecretType {
    /// Storage representation of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::LoginPassword => "login_password",
            Self::Text => "text_data",
            Self::Binary => "binary_data",
            Self::BankCard => "bank_card",
        }
    }

    /// Parse a storage representation back into a type.
    pub fn parse(s: &str) -> Self {
        match s {
            "login_password" => Self::LoginPassword,
            "text_data" => Self::Text,
            "binary_data" => Self::Binary,
            "bank_card" => Self::BankCard,
            _ => Self::Unspecified,
        }
    }
}

/// Field-level validation failure carried inside `DomainError::InvalidSecret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Domain errors propagated verbatim through the service layers and mapped
/// to transport codes only at the RPC boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("secret not found")]
    SecretNotFound,

    #[error("secret already exists")]
    SecretAlreadyExists,

    #[error("version conflict")]
    VersionConflict,

    #[error("invalid secret: {0}")]
    InvalidSecret(ValidationError),

    #[error("invalid secret type")]
    InvalidSecretType,

    #[error("access denied")]
    AccessDenied,

    #[error("invalid token")]
    InvalidToken,

    #[error("{0}")]
    Validation(ValidationError),

    #[error("token expired")]
    TokenExpired,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Generate an opaque unique identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
