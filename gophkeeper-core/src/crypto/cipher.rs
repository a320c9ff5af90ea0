//! AES-GCM authenticated encryption for secret payloads.
//!
//! Wire format is `nonce(12) || ciphertext || auth_tag(16)`. The key length
//! selects the AES variant: 16 bytes for AES-128, 24 for AES-192, 32 for
//! AES-256. Every encryption draws a fresh random nonce.

use aes_gcm::aead::generic_array::typenum::U12;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Key, Nonce};
use rand::RngCore;
use zeroize::Zeroize;

use crate::crypto::{CryptoError, Result};

type Aes192Gcm = AesGcm<aes::Aes192, U12>;

/// Nonce size shared by all three AES-GCM variants.
pub const NONCE_LEN: usize = 12;

/// AEAD cipher over a caller-supplied key.
pub enum AeadCipher {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl AeadCipher {
    /// Build a cipher from a raw key. The key must be 16, 24 or 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(Self::Aes128(Box::new(Aes128Gcm::new(
                Key::<Aes128Gcm>::from_slice(key),
            )))),
            24 => Ok(Self::Aes192(Box::new(Aes192Gcm::new(
                Key::<Aes192Gcm>::from_slice(key),
            )))),
            32 => Ok(Self::Aes256(Box::new(Aes256Gcm::new(
                Key::<Aes256Gcm>::from_slice(key),
            )))),
            n => Err(CryptoError::InvalidKey(n)),
        }
    }

    /// Encrypt a payload, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let sealed = match self {
            Self::Aes128(c) => c.encrypt(&nonce, plaintext),
            Self::Aes192(c) => c.encrypt(&nonce, plaintext),
            Self::Aes256(c) => c.encrypt(&nonce, plaintext),
        }
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext || tag` payload.
    ///
    /// Authentication failure and malformed ciphertext beyond the nonce
    /// both surface as the same opaque `Decrypt` error.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(CryptoError::InvalidCiphertext(
                "shorter than nonce".to_string(),
            ));
        }

        let nonce_bytes: [u8; NONCE_LEN] = data[..NONCE_LEN]
            .try_into()
            .map_err(|_| CryptoError::InvalidCiphertext("invalid nonce".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);

        match self {
            Self::Aes128(c) => c.decrypt(&nonce, &data[NONCE_LEN..]),
            Self::Aes192(c) => c.decrypt(&nonce, &data[NONCE_LEN..]),
            Self::Aes256(c) => c.decrypt(&nonce, &data[NONCE_LEN..]),
        }
        .map_err(|_| CryptoError::Decrypt)
    }
}

/// A client-side data-encryption key for AES-256.
///
/// Generated once per user at first register/login, persisted only in the
/// local session file, never sent to the server. Zeroized on drop.
#[derive(Clone)]
pub struct DataKey {
    key: [u8; 32],
}

impl DataKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Build from a slice; the slice must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(bytes.len()))?;
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
