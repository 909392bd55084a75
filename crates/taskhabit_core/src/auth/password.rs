//! Salted argon2id password digests.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

const SALT_BYTES: usize = 16;

/// Hashing failed before producing a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordError(String);

impl Display for PasswordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl Error for PasswordError {}

/// PHC-formatted argon2id hash as stored in `users.password`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hashes `plaintext` with a fresh random salt.
    pub fn from_plaintext(plaintext: &str) -> Result<Self, PasswordError> {
        hash_password(plaintext).map(Self)
    }

    /// Wraps a digest read back from storage.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether `candidate` hashes to this digest.
    ///
    /// An unparsable stored digest never matches.
    pub fn matches(&self, candidate: &str) -> bool {
        verify_password(candidate, &self.0)
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|err| PasswordError(err.to_string()))?;

    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError(err.to_string()))
}

pub fn verify_password(candidate: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_not_plaintext_and_verifies() {
        let digest = PasswordDigest::from_plaintext("secret123").unwrap();
        assert_ne!(digest.as_str(), "secret123");
        assert!(digest.as_str().starts_with("$argon2id$"));
        assert!(digest.matches("secret123"));
        assert!(!digest.matches("wrong"));
        assert!(!digest.matches(""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret123", &first));
        assert!(verify_password("secret123", &second));
    }

    #[test]
    fn garbage_digest_never_matches() {
        let digest = PasswordDigest::from_stored("secret123");
        assert!(!digest.matches("secret123"));
    }

    #[test]
    fn digest_fits_password_column() {
        let digest = hash_password("a much longer passphrase with spaces").unwrap();
        assert!(digest.len() <= 128);
    }

    #[test]
    fn debug_output_is_redacted() {
        let digest = PasswordDigest::from_plaintext("secret123").unwrap();
        assert!(!format!("{digest:?}").contains("argon2"));
    }
}
