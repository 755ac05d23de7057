use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::utils::error::AppError;

/// Turns plaintext passwords into opaque stored credentials and checks
/// them later. Both calls are CPU-bound; async callers run them on the
/// blocking pool.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

/// Argon2id with a random salt per password, stored as a PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`). Verification reads the
/// cost parameters from the stored string, so raising them later does not
/// invalidate existing credentials.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Smallest cost argon2 accepts. For tests.
    pub fn fast() -> Self {
        let params = Params::new(
            Params::MIN_M_COST,
            Params::MIN_T_COST,
            Params::MIN_P_COST,
            None,
        )
        .unwrap_or_default();
        Self::new(params)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {}", e)))
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = Argon2Hasher::fast();
        let stored = hasher.hash("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &stored));
        assert!(!hasher.verify("wrong horse", &stored));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = Argon2Hasher::fast();
        assert_ne!(hasher.hash("secret").unwrap(), hasher.hash("secret").unwrap());
    }

    #[test]
    fn test_verify_uses_stored_parameters() {
        let stored = Argon2Hasher::fast().hash("secret").unwrap();
        let stronger = Argon2Hasher::new(Params::new(16, 2, 1, None).unwrap());
        assert!(stronger.verify("secret", &stored));
    }

    #[test]
    fn test_malformed_credentials_never_verify() {
        let hasher = Argon2Hasher::fast();
        assert!(!hasher.verify("secret", ""));
        assert!(!hasher.verify("secret", "plaintext-secret"));
        assert!(!hasher.verify("secret", "sha256$1$abc$def"));
        assert!(!hasher.verify("secret", "$argon2id$v=19$m=8,t=1,p=1$bad"));
    }
}
