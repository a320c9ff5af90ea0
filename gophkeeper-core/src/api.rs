//! Wire types for the sync protocol.
//!
//! Shared by the server handlers and the client transport so both sides
//! agree on one JSON shape. Binary fields cross the wire as standard
//! base64 strings.

use serde::{Deserialize, Serialize};

use crate::domain::SecretType;

/// A secret record as it travels over the wire.
///
/// `encrypted_data` is an opaque client-side AEAD envelope; the server
/// stores it without ever holding the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub encrypted_data: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub encrypted_meta: Vec<u8>,
    pub version: i64,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub user_id: String,
    pub last_sync_version: i64,
    pub secrets: Vec<Secret>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Server-side version cursor snapshotted before the client's writes.
    pub current_version: i64,
    /// Rows with `version > last_sync_version`, tombstones included,
    /// in ascending version order.
    pub secrets: Vec<Secret>,
    /// Ids of client secrets rejected by the per-secret version check.
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSecretRequest {
    pub secret_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSecretResponse {
    pub secret: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSecretsRequest {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<SecretType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSecretsResponse {
    pub secrets: Vec<Secret>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSecretRequest {
    pub secret: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSecretResponse {
    pub secret: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSecretRequest {
    pub secret_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSecretResponse {
    pub success: bool,
}

/// Error body returned by the server on every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Standard base64 serialization for `Vec<u8>`.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
