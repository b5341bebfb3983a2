use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::auth::{AuthError, AuthResult};

/// Slow, salted password hashing (Argon2id at the library's safe defaults).
#[derive(Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_password(&self, plain: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(AuthError::from)?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(&self, plain: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct horse").expect("hash");

        assert!(service.verify_password("correct horse", &hash).expect("verify"));
        assert!(!service.verify_password("wrong horse", &hash).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let service = PasswordService::new();
        let first = service.hash_password("correct horse").expect("hash");
        let second = service.hash_password("correct horse").expect("hash");

        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hashes_are_an_error_not_a_mismatch() {
        let service = PasswordService::new();
        assert!(service.verify_password("anything", "not-a-phc-string").is_err());
    }
}
