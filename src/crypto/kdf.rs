//! Argon2id key derivation for password-based encryption.

use crate::config::{argon2_params, KdfParams, NONCE_SIZE};
use crate::crypto::password::Password;
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

/// Key derivation using Argon2id, salted per layer.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: [u8; NONCE_SIZE],
    params: KdfParams,
}

impl KeyDerivation {
    /// Create a KDF with a fresh random salt, used as a new layer's nonce.
    pub fn new(params: KdfParams) -> Self {
        let mut salt = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        Self { salt, params }
    }

    /// Create a KDF from an existing salt (for decryption).
    pub fn from_salt(salt: [u8; NONCE_SIZE], params: KdfParams) -> Self {
        Self { salt, params }
    }

    /// The salt, stored in the layer record as its nonce.
    pub fn salt(&self) -> &[u8; NONCE_SIZE] {
        &self.salt
    }

    /// Derive a 256-bit key from a password.
    pub fn derive_key(&self, password: &Password) -> Result<Zeroizing<[u8; 32]>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(argon2_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(password.as_bytes(), &self.salt, &mut key[..])
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        Ok(key)
    }
}

/// Derive a key for one layer from its password and salt.
pub fn derive_key(
    password: &Password,
    salt: &[u8; NONCE_SIZE],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    KeyDerivation::from_salt(*salt, *params).derive_key(password)
}
