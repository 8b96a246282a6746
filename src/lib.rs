//! Layered Steganographic Containers
//!
//! Hides password-sealed payloads in the least-significant bits of image,
//! audio, video and text carriers. Several independent payloads, each under
//! its own password, can be layered into the same carrier without disturbing
//! one another.
//!
//! # Features
//!
//! - **Four carrier families**: PNG/BMP images, PCM WAV audio, YUV4MPEG2 video
//!   and UTF-8 text documents, detected from the file signature
//! - **AES-256-GCM Encryption**: Authenticated encryption with Argon2id key
//!   derivation, one random nonce and salt per layer
//! - **Append-only layer chain**: New layers are written after existing ones;
//!   a damaged chain is reported, never overwritten
//! - **Capacity planning**: Safe-bit budgets per media family with actionable
//!   sizing guidance when a payload does not fit
//!
//! # Architecture
//!
//! ```text
//! Payload → Encrypt (AES-256-GCM) → Frame (layer record) → Append (chain) → Carrier LSBs
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use layered_stego::codec::Payload;
//!
//! let carrier = std::fs::read("cover.png").unwrap();
//!
//! // Hide a message
//! let stego = layered_stego::embed(&carrier, &Payload::text("hello"), "a").unwrap();
//!
//! // A second, independent layer
//! let report = std::fs::read("doc.docx").unwrap();
//! let payload = Payload::file("doc.docx", report).unwrap();
//! let stego = layered_stego::embed(&stego, &payload, "b").unwrap();
//!
//! // Each password opens its own layer
//! let message = layered_stego::extract(&stego, "a").unwrap();
//! assert_eq!(message.as_text(), Some("hello"));
//! ```

pub mod cancel;
pub mod capacity;
pub mod carrier;
pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod pipeline;

pub use cancel::CancelToken;
pub use capacity::{check_fits, Capacity, FitCheck};
pub use carrier::{CarrierAdapter, MediaKind, SizingGuidance};
pub use chain::LayerHeader;
pub use codec::{ContentType, Payload};
pub use config::StegoConfig;
pub use crypto::Password;
pub use error::{Error, Result};
pub use pipeline::{EmbedReport, StegoEngine};

/// Capacity of a carrier under the default configuration.
pub fn capacity(carrier: &[u8]) -> Result<Capacity> {
    StegoEngine::default().capacity(carrier)
}

/// Embed `payload` under `password` with the default configuration.
pub fn embed(carrier: &[u8], payload: &Payload, password: impl TryInto<Password, Error = Error>) -> Result<Vec<u8>> {
    StegoEngine::default().embed(carrier, payload, password)
}

/// Extract the layer sealed with `password` using the default configuration.
pub fn extract(carrier: &[u8], password: impl TryInto<Password, Error = Error>) -> Result<Payload> {
    StegoEngine::default().extract(carrier, password)
}

/// Layer metadata of a carrier under the default configuration.
pub fn list_layers(carrier: &[u8]) -> Result<Vec<LayerHeader>> {
    StegoEngine::default().list_layers(carrier)
}
