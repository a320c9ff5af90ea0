//! HS256-signed access and refresh tokens.
//!
//! Minimal JWT layer: base64url without padding, HMAC-SHA256 signature
//! verified with `Mac::verify_slice`, JSON claims. Only HS256 tokens are
//! accepted on parse.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::{CryptoError, Result};
use crate::domain::DomainError;

const ISSUER: &str = "gophkeeper";
const TYPE_ACCESS: &str = "access";
const TYPE_REFRESH: &str = "refresh";

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
/// Default refresh token lifetime: 168 hours.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 168 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Signed claim envelope carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

impl TokenClaims {
    /// Whether this is an access token. Consults `type` only.
    pub fn is_access(&self) -> bool {
        self.token_type == TYPE_ACCESS
    }

    /// Whether this is a refresh token. Consults `type` only.
    pub fn is_refresh(&self) -> bool {
        self.token_type == TYPE_REFRESH
    }
}

/// Issues and verifies HS256 tokens under a shared secret.
#[derive(Clone)]
pub struct TokenManager {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Issue a short-lived access token bound to the user and login.
    pub fn issue_access(&self, user_id: &str, login: &str) -> Result<String> {
        self.issue(user_id, Some(login.to_string()), TYPE_ACCESS, self.access_ttl)
    }

    /// Issue a long-lived refresh token bound to the user only.
    pub fn issue_refresh(&self, user_id: &str) -> Result<String> {
        self.issue(user_id, None, TYPE_REFRESH, self.refresh_ttl)
    }

    fn issue(
        &self,
        user_id: &str,
        login: Option<String>,
        token_type: &str,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            login,
            token_type: token_type.to_string(),
            iat: now,
            nbf: now,
            exp: now + ttl.num_seconds(),
            iss: ISSUER.to_string(),
        };

        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| CryptoError::Sign(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| CryptoError::Sign(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| CryptoError::Sign(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Parse and verify a token.
    ///
    /// Expired signatures map to `TokenExpired`; every other parse or
    /// verification failure maps to `InvalidToken`.
    pub fn parse(&self, token: &str) -> std::result::Result<TokenClaims, DomainError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DomainError::InvalidToken);
        };

        let header_raw = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| DomainError::InvalidToken)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_raw).map_err(|_| DomainError::InvalidToken)?;
        if header.alg != "HS256" || !header.typ.eq_ignore_ascii_case("JWT") {
            return Err(DomainError::InvalidToken);
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| DomainError::InvalidToken)?;

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|_| DomainError::InvalidToken)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| DomainError::InvalidToken)?;

        let claims_raw = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| DomainError::InvalidToken)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_raw).map_err(|_| DomainError::InvalidToken)?;

        let now = Utc::now().timestamp();
        if now >= claims.exp {
            return Err(DomainError::TokenExpired);
        }
        if now < claims.nbf {
            return Err(DomainError::InvalidToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(
            "test-secret",
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        )
    }

    #[test]
    fn access_token_roundtrip() {
        let m = manager();
        let token = m.issue_access("u1", "alice").unwrap();
        let claims = m.parse(&token).unwrap();

        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.login.as_deref(), Some("alice"));
        assert_eq!(claims.iss, "gophkeeper");
        assert!(claims.is_access());
        assert!(!claims.is_refresh());
    }

    #[test]
    fn refresh_token_carries_no_login() {
        let m = manager();
        let token = m.issue_refresh("u1").unwrap();
        let claims = m.parse(&token).unwrap();

        assert_eq!(claims.login, None);
        assert!(claims.is_refresh());
        assert!(!claims.is_access());
    }

    #[test]
    fn expired_token_is_distinguished() {
        let m = TokenManager::new("test-secret", -1, -1);
        let token = m.issue_access("u1", "alice").unwrap();
        assert!(matches!(m.parse(&token), Err(DomainError::TokenExpired)));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let m = manager();
        let token = m.issue_access("u1", "alice").unwrap();

        let other = TokenManager::new("other-secret", 60, 60);
        assert!(matches!(other.parse(&token), Err(DomainError::InvalidToken)));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let m = manager();
        let token = m.issue_access("u1", "alice").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(b"{\"user_id\":\"u2\"}");
        parts[1] = &forged;
        let forged_token = parts.join(".");

        assert!(matches!(
            m.parse(&forged_token),
            Err(DomainError::InvalidToken)
        ));
    }

    #[test]
    fn non_hmac_alg_is_rejected() {
        let m = manager();
        let token = m.issue_access("u1", "alice").unwrap();
        let claims_b64 = token.split('.').nth(1).unwrap().to_string();

        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"RS256\",\"typ\":\"JWT\"}");
        let forged = format!("{header}.{claims_b64}.c2ln");

        assert!(matches!(m.parse(&forged), Err(DomainError::InvalidToken)));
    }

    #[test]
    fn garbage_is_invalid() {
        let m = manager();
        assert!(matches!(m.parse(""), Err(DomainError::InvalidToken)));
        assert!(matches!(m.parse("a.b"), Err(DomainError::InvalidToken)));
        assert!(matches!(
            m.parse("not a token at all"),
            Err(DomainError::InvalidToken)
        ));
    }
}
