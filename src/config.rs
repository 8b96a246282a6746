//! Configuration constants and types for the layered stego engine.

use crate::carrier::MediaKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layer magic number: "LSTG" in bytes.
pub const LAYER_MAGIC: [u8; 4] = [0x4C, 0x53, 0x54, 0x47];

/// Current layer record version.
pub const LAYER_VERSION: u8 = 1;

/// AES-GCM nonce size (96 bits). Also the Argon2 salt of the layer.
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

/// Truncated SHA-256 checksum size.
pub const CHECKSUM_SIZE: usize = 4;

/// Bytes before the filename: magic(4) + version(1) + content type(1) + filename length(2).
pub const PREFIX_SIZE: usize = 8;

/// Payload length field size.
pub const PAYLOAD_LEN_SIZE: usize = 4;

/// Fixed bytes of every layer record, excluding filename and payload.
pub const LAYER_OVERHEAD: usize = PREFIX_SIZE + PAYLOAD_LEN_SIZE + NONCE_SIZE + TAG_SIZE + CHECKSUM_SIZE;

/// Smallest possible layer record in bits (empty payload, no filename).
pub const MIN_LAYER_BITS: u64 = (LAYER_OVERHEAD as u64) * 8;

/// Units carried by each line of a document carrier.
pub const DOCUMENT_BITS_PER_LINE: usize = 4;

/// Default upper bound on layers scanned or appended per carrier.
pub const DEFAULT_MAX_LAYERS: usize = 64;

/// Default streaming chunk size for file-backed carriers (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Argon2id parameters for key derivation.
pub mod argon2_params {
    /// Memory cost in KiB (64 MB).
    pub const MEMORY_COST: u32 = 65536;

    /// Time cost (iterations).
    pub const TIME_COST: u32 = 3;

    /// Parallelism factor.
    pub const PARALLELISM: u32 = 4;

    /// Output length in bytes (256 bits).
    pub const OUTPUT_LENGTH: usize = 32;
}

/// Share of each carrier's raw bits that may be used for layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservedFractions {
    pub image: f64,
    pub audio: f64,
    pub video: f64,
    pub document: f64,
}

impl Default for ReservedFractions {
    fn default() -> Self {
        Self {
            image: 0.9,
            audio: 0.5,
            video: 0.5,
            document: 0.9,
        }
    }
}

impl ReservedFractions {
    /// Fraction for a media family.
    pub fn for_kind(&self, kind: MediaKind) -> f64 {
        match kind {
            MediaKind::Image => self.image,
            MediaKind::Audio => self.audio,
            MediaKind::Video => self.video,
            MediaKind::Document => self.document,
        }
    }
}

/// Argon2id cost parameters.
///
/// These are not stored in the carrier, so the extracting side must use the
/// same values as the embedding side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Number of passes.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: argon2_params::MEMORY_COST,
            time_cost: argon2_params::TIME_COST,
            parallelism: argon2_params::PARALLELISM,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StegoConfig {
    /// Safe-capacity fraction per media family.
    #[serde(default)]
    pub reserved: ReservedFractions,

    /// Key derivation cost.
    #[serde(default)]
    pub kdf: KdfParams,

    /// Maximum layers scanned or appended per carrier.
    #[serde(default = "default_max_layers")]
    pub max_layers: usize,

    /// Chunk size used when streaming file-backed carriers.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_max_layers() -> usize {
    DEFAULT_MAX_LAYERS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            reserved: ReservedFractions::default(),
            kdf: KdfParams::default(),
            max_layers: DEFAULT_MAX_LAYERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StegoConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("image", self.reserved.image),
            ("audio", self.reserved.audio),
            ("video", self.reserved.video),
            ("document", self.reserved.document),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} reserved fraction must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.max_layers == 0 {
            return Err(Error::InvalidConfig("max_layers must be greater than 0".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".to_string()));
        }
        argon2::Params::new(
            self.kdf.memory_cost,
            self.kdf.time_cost,
            self.kdf.parallelism,
            Some(argon2_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::InvalidConfig(format!("KDF parameters: {}", e)))?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StegoConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
