//! Cryptographic operations for layered payloads.
//!
//! This module provides:
//! - Password normalisation to canonical bytes
//! - Argon2id password-based key derivation
//! - AES-256-GCM authenticated encryption with detached tags

mod cipher;
mod kdf;
mod password;

pub use cipher::{LayerKey, SealedFrame};
pub use kdf::{derive_key, KeyDerivation};
pub use password::Password;
