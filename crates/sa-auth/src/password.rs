//! Password hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use sa_core::AuthError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::internal(err)
    }
}

/// Argon2id hashing with salted PHC strings.
///
/// Verification reads the parameters embedded in the stored hash, so hashes
/// created with other cost settings still verify. Rows written by the
/// previous service carry bcrypt hashes (`$2a$`, `$2b$`, `$2y$`); those are
/// verified with bcrypt and left in place.
#[derive(Clone)]
pub struct CredentialVerifier {
    params: Params,
    dummy_hash: Arc<OnceCell<String>>,
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier {
    pub fn new() -> Self {
        Self {
            params: Params::default(),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Custom cost parameters (memory in KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// A mismatch and an unparseable stored hash are both `false`
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        if is_bcrypt(stored_hash) {
            return bcrypt::verify(plaintext, stored_hash).unwrap_or(false);
        }
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spend the same work as a real verification when no user exists
    pub fn verify_dummy(&self, plaintext: &str) {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash("dummy-password-for-unknown-users"));
        match hash {
            Ok(hash) => {
                let _ = self.verify(plaintext, hash);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to build dummy hash"),
        }
    }
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> CredentialVerifier {
        CredentialVerifier::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let verifier = fast();
        let hash = verifier.hash("password123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verifier.verify("password123", &hash));
        assert!(!verifier.verify("password124", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let verifier = fast();
        let a = verifier.hash("same").unwrap();
        let b = verifier.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        let verifier = fast();
        assert!(!verifier.verify("password123", "not-a-hash"));
        assert!(!verifier.verify("password123", ""));
    }

    #[test]
    fn test_verify_accepts_other_cost_settings() {
        let strong = CredentialVerifier::with_params(16, 2, 1).unwrap();
        let hash = strong.hash("pw").unwrap();
        assert!(fast().verify("pw", &hash));
    }

    #[test]
    fn test_verify_bcrypt_hashes() {
        let verifier = fast();
        let hash = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
        assert!(verifier.verify("U*U", hash));
        assert!(!verifier.verify("U*V", hash));

        let cost4 = bcrypt::hash("secret", 4).unwrap();
        assert!(cost4.starts_with("$2b$"));
        assert!(verifier.verify("secret", &cost4));
        assert!(verifier.verify("secret", &cost4.replacen("$2b$", "$2y$", 1)));
        assert!(!verifier.verify("other", &cost4));
    }

    #[test]
    fn test_truncated_bcrypt_hash_is_rejected() {
        assert!(!fast().verify("U*U", "$2a$05$CCCC"));
    }

    #[test]
    fn test_invalid_params() {
        assert!(CredentialVerifier::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn test_verify_dummy_does_not_panic() {
        let verifier = fast();
        verifier.verify_dummy("anything");
        verifier.verify_dummy("again");
        assert!(verifier.dummy_hash.get().is_some());
    }
}
