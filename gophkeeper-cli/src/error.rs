//! Client-side error type.

use gophkeeper_core::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Error body returned by the server.
    #[error("server error {code}: {message}")]
    Api { code: String, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not authenticated, run login first")]
    NotAuthenticated,

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl ClientError {
    /// Whether the server rejected our credentials; triggers the token
    /// refresh flow.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == "UNAUTHENTICATED")
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
