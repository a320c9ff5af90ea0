//! Random key generation and base64 transport helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::{CryptoError, Result};

/// Generate a random AES key of 16, 24 or 32 bytes.
pub fn generate_key(len: usize) -> Result<Vec<u8>> {
    if len != 16 && len != 24 && len != 32 {
        return Err(CryptoError::InvalidKey(len));
    }
    let mut key = vec![0u8; len];
    OsRng.fill_bytes(&mut key);
    Ok(key)
}

/// Encode a key for storage in config files.
pub fn key_to_base64(key: &[u8]) -> String {
    STANDARD.encode(key)
}

/// Decode a base64 key and check its length.
pub fn key_from_base64(encoded: &str) -> Result<Vec<u8>> {
    let key = STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
    if key.len() != 16 && key.len() != 24 && key.len() != 32 {
        return Err(CryptoError::InvalidKey(key.len()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_lengths() {
        for len in [16, 24, 32] {
            assert_eq!(generate_key(len).unwrap().len(), len);
        }
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(generate_key(0).is_err());
        assert!(generate_key(31).is_err());
    }

    #[test]
    fn base64_roundtrip() {
        let key = generate_key(32).unwrap();
        let encoded = key_to_base64(&key);
        assert_eq!(key_from_base64(&encoded).unwrap(), key);
    }

    #[test]
    fn base64_with_wrong_length_rejected() {
        let encoded = STANDARD.encode([0u8; 20]);
        assert!(key_from_base64(&encoded).is_err());
    }
}
