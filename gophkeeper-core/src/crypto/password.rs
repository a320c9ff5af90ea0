//! bcrypt password hashing.

use crate::crypto::{CryptoError, Result};

/// Default bcrypt cost.
pub const DEFAULT_COST: u32 = 10;

/// Salted password hasher.
///
/// A pure function of its cost; build one at startup and thread it through
/// instead of reaching for process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password into a salted bcrypt digest.
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).map_err(|e| CryptoError::Hash(e.to_string()))
    }

    /// Verify a password against a stored digest.
    ///
    /// A malformed digest verifies as `false` rather than erroring.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt at the default cost is slow; use the minimum for tests.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let digest = h.hash("hunter2xx").unwrap();
        assert!(h.verify("hunter2xx", &digest));
        assert!(!h.verify("hunter2xy", &digest));
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        let h = hasher();
        let d1 = h.hash("hunter2xx").unwrap();
        let d2 = h.hash("hunter2xx").unwrap();
        assert_ne!(d1, d2);
        assert!(h.verify("hunter2xx", &d1));
        assert!(h.verify("hunter2xx", &d2));
    }

    #[test]
    fn malformed_digest_verifies_false() {
        let h = hasher();
        assert!(!h.verify("hunter2xx", "not-a-bcrypt-digest"));
        assert!(!h.verify("hunter2xx", ""));
    }

    #[test]
    fn default_cost_is_ten() {
        assert_eq!(PasswordHasher::default().cost, 10);
    }
}
