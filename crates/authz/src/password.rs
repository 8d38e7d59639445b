//! Password hashing (Argon2id) and strength rules applied at registration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::AuthError;

const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1", "qwerty",
    "qwerty123", "abc123", "111111", "iloveyou", "letmein", "welcome", "monkey", "dragon",
    "football", "baseball", "sunshine", "princess", "admin", "passw0rd", "trustno1",
];

/// Hashes and verifies passwords with a fixed Argon2id configuration.
#[derive(Clone)]
pub struct PasswordService {
    argon: Argon2<'static>,
}

impl PasswordService {
    /// `memory_kib` is the Argon2 memory cost; time cost and lanes stay at the
    /// OWASP baseline of 2 and 1.
    pub fn new(memory_kib: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, 2, 1, None)
            .map_err(|err| AuthError::Hashing(err.to_string()))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hashing(err.to_string()))
    }

    /// Unparseable stored hashes verify as `false`.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is malformed");
                false
            }
        }
    }
}

/// Strength problems with `password`; empty when acceptable.
pub fn validate_strength(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }
    let username = username.to_lowercase();
    if !username.is_empty() && (lowered.contains(&username) || username.contains(&lowered)) {
        problems.push("The password is too similar to the username.".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let service = PasswordService::new(1024).unwrap();
        let hash = service.hash("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("correct horse battery", &hash));
        assert!(!service.verify("wrong horse battery", &hash));
        assert!(!service.verify("anything", "not-a-phc-string"));
    }

    #[test]
    fn strength_rules() {
        assert!(validate_strength("Tr1cky-Shelf", "reader").is_empty());
        assert_eq!(validate_strength("short", "reader").len(), 1);
        assert!(validate_strength("12345678", "reader")
            .iter()
            .any(|p| p.contains("entirely numeric")));
        assert!(validate_strength("Password", "reader")
            .iter()
            .any(|p| p.contains("too common")));
        assert!(validate_strength("bookworm99", "bookworm")
            .iter()
            .any(|p| p.contains("similar to the username")));
    }
}
