//! Password Hashing
//!
//! Argon2id hashing and verification. Hashing is deliberately expensive, so
//! the async wrappers run it on the blocking thread pool to keep unrelated
//! requests moving.

use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2, Params,
};

/// Input hashed at construction to give the absent-user signin path the same
/// cost as a real verification.
const DUMMY_PASSWORD: &str = "authkit-dummy-credential";

/// Argon2id password hasher with configured cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Create a hasher and precompute the dummy hash
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, AuthError> {
        let mut hasher = Self {
            memory_cost,
            time_cost,
            parallelism,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(hasher)
    }

    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| AuthError::Internal)?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// Malformed stored input is an authentication failure, not an error.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        let Ok(argon2) = self.argon2() else {
            return false;
        };
        argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Precomputed hash for the constant-cost failure path
    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    /// Hash on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthError::Internal)?
    }

    /// Verify on the blocking pool
    pub async fn verify_blocking(&self, hash: String, password: String) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|_| AuthError::Internal)
    }
}
