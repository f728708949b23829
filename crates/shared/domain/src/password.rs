//! Password hashing - salted Argon2id credentials.
//!
//! A [`Credential`] stores the digest and the salt separately, both base64
//! encoded. Cost parameters are fixed constants shared by hashing and
//! verification, so a credential written today verifies tomorrow.

use argon2::{
    password_hash::rand_core::{OsRng, RngCore},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::constants::{
    ARGON2_MEMORY_COST_KIB, ARGON2_PARALLELISM, ARGON2_TIME_COST, HASH_LENGTH, SALT_LENGTH,
};
use crate::error::{DomainError, DomainResult};

/// Stored password credential (hash + salt), never the plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    hash: String,
    salt: String,
}

// Don't expose hash material in debug output
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("hash", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    /// Rebuild a credential from its stored columns.
    pub fn from_parts(hash: impl Into<String>, salt: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            salt: salt.into(),
        }
    }

    /// Well-formed credential that no password verifies against.
    ///
    /// Lets callers spend a full verification when there is nothing to
    /// verify, so a missing account costs the same as a wrong password.
    pub fn unmatchable() -> Self {
        Self {
            hash: STANDARD.encode([0u8; HASH_LENGTH]),
            salt: STANDARD.encode([0u8; SALT_LENGTH]),
        }
    }

    /// Encoded digest
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Encoded salt
    pub fn salt(&self) -> &str {
        &self.salt
    }
}

/// Derives and verifies password credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns [`DomainError::Hashing`] if the OS randomness source fails.
    pub fn hash(&self, password: &str) -> DomainResult<Credential> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| DomainError::hashing(format!("randomness source failed: {}", e)))?;

        let digest = derive(password.as_bytes(), &salt)?;

        Ok(Credential {
            hash: STANDARD.encode(digest),
            salt: STANDARD.encode(salt),
        })
    }

    /// Check a password against a stored credential.
    ///
    /// Malformed stored encodings verify as `false`.
    pub fn verify(&self, password: &str, credential: &Credential) -> bool {
        let Ok(salt) = STANDARD.decode(&credential.salt) else {
            return false;
        };
        let Ok(expected) = STANDARD.decode(&credential.hash) else {
            return false;
        };
        let Ok(computed) = derive(password.as_bytes(), &salt) else {
            return false;
        };

        expected.as_slice().ct_eq(computed.as_slice()).into()
    }
}

fn derive(password: &[u8], salt: &[u8]) -> DomainResult<[u8; HASH_LENGTH]> {
    let params = Params::new(
        ARGON2_MEMORY_COST_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(HASH_LENGTH),
    )
    .map_err(|e| DomainError::hashing(e.to_string()))?;

    let mut out = [0u8; HASH_LENGTH];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| DomainError::hashing(e.to_string()))?;

    Ok(out)
}
