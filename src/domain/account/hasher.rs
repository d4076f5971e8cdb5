use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::config::{ConfigError, HashingConfig};
use super::errors::HashError;
use super::value_objects::HashedSecret;

// ============================================================================
// Password Hasher - Argon2id with a fresh random salt per call
// ============================================================================
//
// Output is a PHC string ($argon2id$v=19$m=..,t=..,p=..$salt$hash), so the
// salt and cost parameters travel with the hash and `verify` needs nothing
// else. Two hashes of the same plaintext never compare equal.
//
// ============================================================================

const SALT_LEN: usize = 16;

type SaltSource = fn(&mut [u8]) -> Result<(), rand::Error>;

fn os_salt(buf: &mut [u8]) -> Result<(), rand::Error> {
    OsRng.try_fill_bytes(buf)
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    salt_source: SaltSource,
}

impl PasswordHasher {
    pub fn new(config: &HashingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            params: config.params()?,
            salt_source: os_salt,
        })
    }

    /// Same hasher drawing salt from `salt_source` instead of the OS.
    #[cfg(test)]
    pub(crate) fn with_salt_source(mut self, salt_source: SaltSource) -> Self {
        self.salt_source = salt_source;
        self
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> Result<HashedSecret, HashError> {
        let mut salt = [0u8; SALT_LEN];
        (self.salt_source)(&mut salt).map_err(|e| HashError::Entropy(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| HashError::Algorithm(e.to_string()))?;

        let encoded = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Algorithm(e.to_string()))?
            .to_string();

        Ok(HashedSecret::from_encoded(encoded))
    }

    /// False for a wrong password and for an unparseable stored hash.
    pub fn verify(&self, plaintext: &str, hashed: &HashedSecret) -> bool {
        let parsed = match PasswordHash::new(hashed.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };

        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Run `hash` on the blocking pool so request workers are not stalled
    /// by the key-derivation cost.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<HashedSecret, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| HashError::Aborted(e.to_string()))?
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
