//! Cryptographic primitives for GophKeeper.
//!
//! This module provides:
//! - AES-GCM authenticated encryption of secret payloads
//! - bcrypt password hashing
//! - HS256 signed access/refresh tokens
//! - Random key generation helpers

pub mod cipher;
pub mod keys;
pub mod password;
pub mod token;

use thiserror::Error;

/// Errors that can occur in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid key length: expected 16, 24 or 32 bytes, got {0}")]
    InvalidKey(usize),

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed")]
    Decrypt,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Sign(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
