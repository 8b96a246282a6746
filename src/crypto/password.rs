//! Password normalisation.
//!
//! Every password enters the engine through [`Password`]; this is the only
//! place where caller input becomes key material bytes.

use crate::error::{Error, Result};
use std::fmt;
use zeroize::Zeroizing;

/// A validated, non-empty UTF-8 password.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Build a password from text.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = Zeroizing::new(text.into());
        if text.is_empty() {
            return Err(Error::InvalidPassword("password is empty".to_string()));
        }
        Ok(Self(text))
    }

    /// Build a password from raw bytes, which must be UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::InvalidPassword("password is not valid UTF-8 text".to_string()))?;
        Self::new(text)
    }

    /// Canonical byte form fed to the KDF.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl TryFrom<&str> for Password {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Password::new(value)
    }
}

impl TryFrom<String> for Password {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Password::new(value)
    }
}

impl TryFrom<&String> for Password {
    type Error = Error;

    fn try_from(value: &String) -> Result<Self> {
        Password::new(value.as_str())
    }
}

impl TryFrom<&[u8]> for Password {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        Password::from_bytes(value)
    }
}

impl TryFrom<&Password> for Password {
    type Error = Error;

    fn try_from(value: &Password) -> Result<Self> {
        Ok(value.clone())
    }
}
