//! Local representations of secrets and the user session.
//!
//! Secrets live in plaintext on disk; they are encrypted only for
//! transport and server storage.

use gophkeeper_core::api::base64_bytes;
use gophkeeper_core::{new_id, SecretType};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Typed secret payload. The wire form is the bare variant struct encoded
/// as JSON and dispatched on the wire `type` enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretPayload {
    LoginPassword(LoginPasswordData),
    Text(TextData),
    BankCard(BankCardData),
    Binary(BinaryData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginPasswordData {
    pub login: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankCardData {
    pub card_holder: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryData {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecretPayload {
    pub fn secret_type(&self) -> SecretType {
        match self {
            Self::LoginPassword(_) => SecretType::LoginPassword,
            Self::Text(_) => SecretType::Text,
            Self::BankCard(_) => SecretType::BankCard,
            Self::Binary(_) => SecretType::Binary,
        }
    }

    /// Encode the bare variant struct for the encryption envelope.
    pub fn to_wire_json(&self) -> Result<Vec<u8>, ClientError> {
        let encoded = match self {
            Self::LoginPassword(d) => serde_json::to_vec(d),
            Self::Text(d) => serde_json::to_vec(d),
            Self::BankCard(d) => serde_json::to_vec(d),
            Self::Binary(d) => serde_json::to_vec(d),
        };
        encoded.map_err(|e| ClientError::InvalidData(e.to_string()))
    }

    /// Decode a decrypted wire payload, dispatching on the wire type.
    pub fn from_wire_json(secret_type: SecretType, bytes: &[u8]) -> Result<Self, ClientError> {
        let payload = match secret_type {
            SecretType::LoginPassword => Self::LoginPassword(
                serde_json::from_slice(bytes)
                    .map_err(|e| ClientError::InvalidData(e.to_string()))?,
            ),
            SecretType::Text => Self::Text(
                serde_json::from_slice(bytes)
                    .map_err(|e| ClientError::InvalidData(e.to_string()))?,
            ),
            SecretType::BankCard => Self::BankCard(
                serde_json::from_slice(bytes)
                    .map_err(|e| ClientError::InvalidData(e.to_string()))?,
            ),
            SecretType::Binary => Self::Binary(
                serde_json::from_slice(bytes)
                    .map_err(|e| ClientError::InvalidData(e.to_string()))?,
            ),
            SecretType::Unspecified => {
                return Err(ClientError::InvalidData(
                    "unknown secret type".to_string(),
                ))
            }
        };
        Ok(payload)
    }
}

/// A secret as stored locally: typed plaintext plus sync bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretData {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub name: String,
    pub data: SecretPayload,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Modified or created since the last successful upload.
    pub is_dirty: bool,
    pub is_deleted: bool,
}

impl SecretData {
    /// Build a fresh local secret owned by `user_id`, marked dirty so the
    /// next sync uploads it.
    pub fn new(user_id: &str, name: &str, data: SecretPayload) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            secret_type: data.secret_type(),
            name: name.to_string(),
            data,
            version: 0,
            created_at: now,
            updated_at: now,
            is_dirty: true,
            is_deleted: false,
        }
    }
}

/// Singleton per-install session.
///
/// The encryption key is generated at first register/login, persisted only
/// here, and never sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub login: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(with = "base64_bytes")]
    pub encryption_key: Vec<u8>,
    /// Wall-clock of the last sync, unix seconds.
    #[serde(default)]
    pub last_sync: i64,
    /// Highest server version observed for this user.
    #[serde(default)]
    pub last_sync_version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_payload_is_the_bare_struct() {
        let payload = SecretPayload::LoginPassword(LoginPasswordData {
            login: "a".to_string(),
            password: "b".to_string(),
            website: None,
            notes: None,
        });

        let wire = payload.to_wire_json().unwrap();
        assert_eq!(
            String::from_utf8(wire).unwrap(),
            "{\"login\":\"a\",\"password\":\"b\"}"
        );
    }

    #[test]
    fn wire_roundtrip_dispatches_on_type() {
        let payload = SecretPayload::BankCard(BankCardData {
            card_holder: "ALICE A".to_string(),
            card_number: "4111111111111111".to_string(),
            expiry_date: "12/30".to_string(),
            cvv: "123".to_string(),
            bank_name: Some("gophbank".to_string()),
        });

        let wire = payload.to_wire_json().unwrap();
        let decoded = SecretPayload::from_wire_json(SecretType::BankCard, &wire).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn mismatched_type_fails_decoding() {
        let payload = SecretPayload::Text(TextData {
            content: "note".to_string(),
            description: None,
        });
        let wire = payload.to_wire_json().unwrap();

        assert!(SecretPayload::from_wire_json(SecretType::LoginPassword, &wire).is_err());
        assert!(SecretPayload::from_wire_json(SecretType::Unspecified, &wire).is_err());
    }

    #[test]
    fn binary_payload_base64_roundtrip() {
        let payload = SecretPayload::Binary(BinaryData {
            data: vec![0, 1, 2, 255],
            file_name: "key.bin".to_string(),
            description: None,
        });
        let wire = payload.to_wire_json().unwrap();
        let decoded = SecretPayload::from_wire_json(SecretType::Binary, &wire).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn new_secret_is_dirty_and_typed() {
        let secret = SecretData::new(
            "u1",
            "gmail",
            SecretPayload::LoginPassword(LoginPasswordData {
                login: "a".to_string(),
                password: "b".to_string(),
                website: None,
                notes: None,
            }),
        );

        assert!(secret.is_dirty);
        assert!(!secret.is_deleted);
        assert_eq!(secret.secret_type, SecretType::LoginPassword);
        assert_eq!(secret.version, 0);
        assert!(!secret.id.is_empty());
    }

    #[test]
    fn session_json_carries_key_as_base64() {
        let session = Session {
            user_id: "u1".to_string(),
            login: "alice".to_string(),
            access_token: String::new(),
            refresh_token: String::new(),
            encryption_key: vec![0xAB; 32],
            last_sync: 0,
            last_sync_version: 0,
        };

        let json = serde_json::to_string(&session).unwrap();
        // base64 string, not a JSON byte array
        assert!(json.contains("\"encryption_key\":\"q6ur"));
        let decoded: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.encryption_key, session.encryption_key);
    }
}
