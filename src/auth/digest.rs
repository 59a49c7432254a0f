use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

const ARGON2_PREFIX: &str = "$argon2";

/// Failures while digesting or checking a password.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Argon2 could not hash the password.
    #[error("password hashing failed: {0}")]
    Hash(String),
    /// A stored argon2 hash does not parse.
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),
}

/// How passwords of new users are digested before being stored.
///
/// `Sha256` is a single unsalted SHA-256 pass rendered as lowercase hex, the
/// format every existing record uses. `Argon2` produces salted PHC strings.
/// Verification accepts either format whatever the configured scheme is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Unsalted SHA-256, lowercase hex.
    #[default]
    Sha256,
    /// Argon2 with a random salt.
    Argon2,
}

impl PasswordScheme {
    /// Digest to store for `secret`.
    pub fn digest(self, secret: &str) -> Result<String, DigestError> {
        match self {
            PasswordScheme::Sha256 => Ok(sha256_hex(secret)),
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(secret.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| DigestError::Hash(e.to_string()))
            }
        }
    }
}

/// Lowercase hex SHA-256 of the raw secret.
pub fn sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Checks `secret` against a stored digest of either scheme.
pub fn verify(secret: &str, stored: &str) -> Result<bool, DigestError> {
    if stored.starts_with(ARGON2_PREFIX) {
        let parsed = PasswordHash::new(stored).map_err(|e| DigestError::Malformed(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    } else {
        Ok(sha256_hex(secret) == stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUNTERS2: &str = "b2ead36c926ae694feed504bc23e0e7fe0ca23fd436d7077fb69c93a8225c190";

    #[test]
    fn sha256_matches_known_vectors() {
        assert_eq!(sha256_hex("hunters2"), HUNTERS2);
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_is_deterministic_and_distinguishes_secrets() {
        assert_eq!(sha256_hex("hunters2"), sha256_hex("hunters2"));
        assert_ne!(sha256_hex("hunters2"), sha256_hex("wrong"));
        assert_eq!(sha256_hex("wrong").len(), 64);
    }

    #[test]
    fn default_scheme_stores_plain_sha256() {
        let digest = PasswordScheme::default().digest("hunters2").unwrap();
        assert_eq!(digest, HUNTERS2);
        assert_ne!(digest, "hunters2");
    }

    #[test]
    fn verify_compares_sha256_digests_exactly() {
        assert!(verify("hunters2", HUNTERS2).unwrap());
        assert!(!verify("wrong", HUNTERS2).unwrap());
        assert!(!verify("hunters2", &HUNTERS2.to_uppercase()).unwrap());
    }

    #[test]
    fn argon2_digests_are_salted_and_verifiable() {
        let first = PasswordScheme::Argon2.digest("hunters2").unwrap();
        let second = PasswordScheme::Argon2.digest("hunters2").unwrap();
        assert!(first.starts_with(ARGON2_PREFIX));
        assert_ne!(first, second);
        assert!(verify("hunters2", &first).unwrap());
        assert!(!verify("wrong", &first).unwrap());
    }
}
