//! Shared master password gate and session tokens
//!
//! Tally is single-tenant: everyone who knows the master password gets in.
//! The password is hashed once with Argon2 when the gate is built, and only
//! the SHA-256 digest of a session token is ever written to the database.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Environment variable holding the shared master password
pub const MASTER_PASSWORD_ENV: &str = "TALLY_MASTER_PASSWORD";

/// Number of random bytes in a session token (hex doubles the length)
const TOKEN_BYTES: usize = 32;

/// Verifies candidate passwords against the hashed master password
#[derive(Clone)]
pub struct PasswordGate {
    hash: String,
}

impl PasswordGate {
    /// Hash the master password with a fresh random salt
    pub fn new(password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::Auth("Master password must not be empty".to_string()));
        }

        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Encryption(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(Self { hash })
    }

    /// Build the gate from `TALLY_MASTER_PASSWORD`
    pub fn from_env() -> Result<Self> {
        let password = std::env::var(MASTER_PASSWORD_ENV).map_err(|_| {
            Error::Auth(format!(
                "Master password required. Set {} or run with --no-auth for local development.",
                MASTER_PASSWORD_ENV
            ))
        })?;
        Self::new(&password)
    }

    /// Check a candidate password
    pub fn verify(&self, candidate: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGate").finish_non_exhaustive()
    }
}

/// Generate a new random session token (hex encoded)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in place of the session token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
