//! GophKeeper Core Library
//!
//! Shared building blocks for the GophKeeper server and client:
//! cryptographic primitives (AEAD envelopes, password hashing, signed
//! tokens), the domain error taxonomy, and the wire types exchanged over
//! the sync protocol.

pub mod api;
pub mod crypto;
pub mod domain;

pub use crypto::cipher::{AeadCipher, DataKey};
pub use crypto::keys::{generate_key, key_from_base64, key_to_base64};
pub use crypto::password::PasswordHasher;
pub use crypto::token::{TokenClaims, TokenManager};
pub use crypto::CryptoError;
pub use domain::{new_id, DomainError, SecretType, ValidationError};
