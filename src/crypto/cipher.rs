//! AES-256-GCM authenticated encryption for one layer.
//!
//! A layer moves through `Plaintext -> LayerKey (keyed) -> SealedFrame`; only
//! the sealed form is ever written to a carrier. Opening a sealed frame either
//! verifies and returns the plaintext or fails with
//! [`Error::AuthenticationFailed`].

use crate::config::{KdfParams, NONCE_SIZE, TAG_SIZE};
use crate::crypto::kdf::KeyDerivation;
use crate::crypto::password::Password;
use crate::error::{Error, Result};
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce, Tag};

/// Ciphertext, detached tag and nonce of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFrame {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

/// A key bound to one layer's nonce.
pub struct LayerKey {
    cipher: Aes256Gcm,
    nonce: [u8; NONCE_SIZE],
}

impl LayerKey {
    /// Derive the key for an existing layer from its stored nonce.
    pub fn derive(password: &Password, nonce: [u8; NONCE_SIZE], params: &KdfParams) -> Result<Self> {
        Self::from_kdf(&KeyDerivation::from_salt(nonce, *params), password)
    }

    /// Derive a key for a new layer. The random KDF salt becomes the nonce.
    pub fn generate(password: &Password, params: &KdfParams) -> Result<Self> {
        Self::from_kdf(&KeyDerivation::new(*params), password)
    }

    fn from_kdf(kdf: &KeyDerivation, password: &Password) -> Result<Self> {
        let key = kdf.derive_key(password)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Ok(Self {
            cipher,
            nonce: *kdf.salt(),
        })
    }

    /// The nonce this key is bound to.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Encrypt a payload. Consumes the key so a nonce is never reused.
    pub fn seal(self, associated_data: &[u8], plaintext: &[u8]) -> Result<SealedFrame> {
        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&self.nonce), associated_data, &mut buffer)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);

        Ok(SealedFrame {
            nonce: self.nonce,
            ciphertext: buffer,
            tag: tag_bytes,
        })
    }

    /// Verify and decrypt a sealed frame.
    pub fn open(&self, associated_data: &[u8], sealed: &SealedFrame) -> Result<Vec<u8>> {
        if sealed.nonce != self.nonce {
            return Err(Error::AuthenticationFailed);
        }

        let mut buffer = sealed.ciphertext.clone();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&sealed.nonce),
                associated_data,
                &mut buffer,
                Tag::from_slice(&sealed.tag),
            )
            .map_err(|_| Error::AuthenticationFailed)?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> KdfParams {
        KdfParams {
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn pw(text: &str) -> Password {
        Password::new(text).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let plaintext = b"Hello, World! This is a secret message.";
        let key = LayerKey::generate(&pw("secure_password_123"), &cheap()).unwrap();
        let nonce = *key.nonce();

        let sealed = key.seal(b"header", plaintext).unwrap();
        assert_eq!(sealed.ciphertext.len(), plaintext.len());

        let key = LayerKey::derive(&pw("secure_password_123"), nonce, &cheap()).unwrap();
        let opened = key.open(b"header", &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_password_fails() {
        let key = LayerKey::generate(&pw("correct_password"), &cheap()).unwrap();
        let nonce = *key.nonce();
        let sealed = key.seal(b"", b"Secret data").unwrap();

        let wrong = LayerKey::derive(&pw("wrong_password"), nonce, &cheap()).unwrap();
        assert!(matches!(wrong.open(b"", &sealed), Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_associated_data_fails() {
        let key = LayerKey::generate(&pw("password"), &cheap()).unwrap();
        let nonce = *key.nonce();
        let sealed = key.seal(b"filename=a.txt", b"data").unwrap();

        let key = LayerKey::derive(&pw("password"), nonce, &cheap()).unwrap();
        let result = key.open(b"filename=b.txt", &sealed);
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = LayerKey::generate(&pw("password"), &cheap()).unwrap();
        let nonce = *key.nonce();
        let mut sealed = key.seal(b"", b"Secret data").unwrap();
        if let Some(byte) = sealed.ciphertext.last_mut() {
            *byte ^= 0xFF;
        }

        let key = LayerKey::derive(&pw("password"), nonce, &cheap()).unwrap();
        assert!(matches!(key.open(b"", &sealed), Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = LayerKey::generate(&pw("password"), &cheap()).unwrap();
        let nonce = *key.nonce();
        let sealed = key.seal(b"", b"").unwrap();

        let key = LayerKey::derive(&pw("password"), nonce, &cheap()).unwrap();
        assert!(key.open(b"", &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_generate_matches_derive_from_salt() {
        let kdf = KeyDerivation::new(cheap());
        let generated = LayerKey::from_kdf(&kdf, &pw("password")).unwrap();
        assert_eq!(generated.nonce(), kdf.salt());

        let sealed = generated.seal(b"aad", b"payload").unwrap();
        let derived = LayerKey::derive(&pw("password"), *kdf.salt(), &cheap()).unwrap();
        assert_eq!(derived.open(b"aad", &sealed).unwrap(), b"payload");
    }

    #[test]
    fn test_fresh_nonces_differ() {
        let a = LayerKey::generate(&pw("password"), &cheap()).unwrap();
        let b = LayerKey::generate(&pw("password"), &cheap()).unwrap();
        assert_ne!(a.nonce(), b.nonce());
    }
}
