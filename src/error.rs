//! Error types for the layered steganography engine.

use crate::carrier::SizingGuidance;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while embedding or extracting layers.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a carrier or writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The carrier signature is not one of the supported media families.
    #[error("Unsupported carrier format: {0}")]
    UnsupportedCarrierFormat(String),

    /// The signature was recognised but the container structure is broken.
    #[error("Malformed carrier: {0}")]
    MalformedCarrier(String),

    /// The carrier cannot hold the first layer.
    #[error("Carrier too small: need {needed_bits} bits, have {available_bits} bits ({guidance})")]
    CarrierTooSmall {
        needed_bits: u64,
        available_bits: u64,
        guidance: SizingGuidance,
    },

    /// The carrier already holds layers and the new one does not fit after them.
    #[error("Layer chain full: need {needed_bits} bits, have {available_bits} bits ({guidance})")]
    ChainFull {
        needed_bits: u64,
        available_bits: u64,
        guidance: SizingGuidance,
    },

    /// The chain already holds the maximum number of layers.
    #[error("Layer chain already holds the maximum of {limit} layers")]
    TooManyLayers { limit: usize },

    /// The layer bit-stream is out of sync or damaged.
    #[error("Layer frame corrupt: {0}")]
    FrameCorrupt(String),

    /// The authentication tag did not verify for this layer.
    #[error("Authentication failed for layer")]
    AuthenticationFailed,

    /// No layer in the chain verified with the supplied password.
    #[error("No layer matches the supplied password")]
    NoMatchingLayer,

    /// Unified extraction failure; never says which of the two it was.
    #[error("Wrong password or no hidden data")]
    WrongPasswordOrNoHiddenData,

    /// The password could not be normalised to text.
    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    /// The payload cannot be framed (bad filename, oversized content).
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Key derivation error.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// An elementary unit index past the end of the carrier.
    #[error("Unit index {index} out of range (carrier has {count} units)")]
    UnitOutOfRange { index: u64, count: u64 },

    /// The requested output path resolves to the source carrier.
    #[error("Refusing to overwrite the source carrier: {0}")]
    OutputIsSource(PathBuf),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Non-technical message for end users, one per error kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Io(_) => "The file could not be read or written.",
            Error::UnsupportedCarrierFormat(_) => {
                "This file type cannot hide data. Use a PNG, BMP, WAV, Y4M or plain text file."
            }
            Error::MalformedCarrier(_) => "The carrier file appears to be damaged.",
            Error::CarrierTooSmall { .. } => {
                "The carrier file is too small for this content. Choose a larger file."
            }
            Error::ChainFull { .. } => {
                "The carrier has no room left for more hidden content. Choose a larger file."
            }
            Error::TooManyLayers { .. } => "The carrier already holds the maximum number of hidden items.",
            Error::FrameCorrupt(_) => "The hidden data in this file is damaged.",
            Error::AuthenticationFailed
            | Error::NoMatchingLayer
            | Error::WrongPasswordOrNoHiddenData => {
                "Wrong password, or this file contains no hidden data."
            }
            Error::InvalidPassword(_) => "The password is not valid text.",
            Error::InvalidPayload(_) => "The content to hide is not valid.",
            Error::KeyDerivation(_) | Error::Encryption(_) => "Encryption failed.",
            Error::UnitOutOfRange { .. } => "The hidden data in this file is damaged.",
            Error::OutputIsSource(_) => "Choose a different output file; the original is never overwritten.",
            Error::InvalidConfig(_) | Error::Serialization(_) => "The engine configuration is invalid.",
            Error::Cancelled => "The operation was cancelled.",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_failures_share_message() {
        let a = Error::AuthenticationFailed.user_message();
        let b = Error::WrongPasswordOrNoHiddenData.user_message();
        let c = Error::NoMatchingLayer.user_message();

        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_capacity_error_renders_guidance() {
        let err = Error::CarrierTooSmall {
            needed_bits: 1000,
            available_bits: 10,
            guidance: SizingGuidance::DocumentLines { min_lines: 250 },
        };
        let text = err.to_string();

        assert!(text.contains("1000"));
        assert!(text.contains("250 lines"));
    }
}
