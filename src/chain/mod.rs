//! Append-only layer chain.
//!
//! Layers are written back to back starting at unit 0. The chain ends at the
//! first offset without a valid magic, at the safe-bits boundary, or after
//! the configured maximum number of layers.

mod registry;

pub use registry::{ChainState, LayerRegistry, Layers};

use crate::codec::{ContentType, DecodedRecord};
use crate::config::NONCE_SIZE;
use serde::{Deserialize, Serialize};

/// Metadata of one layer, readable without a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerHeader {
    /// Position in scan order, from 0.
    pub index: usize,
    /// First unit of the record.
    pub offset_bits: u64,
    pub version: u8,
    pub content_type: ContentType,
    pub filename: Option<String>,
    pub payload_len: u32,
    pub nonce: [u8; NONCE_SIZE],
    record_len: usize,
}

impl LayerHeader {
    pub(crate) fn from_record(index: usize, offset_bits: u64, record: &DecodedRecord) -> Self {
        Self {
            index,
            offset_bits,
            version: record.version,
            content_type: record.content_type,
            filename: record.filename.clone(),
            payload_len: record.payload_len,
            nonce: record.sealed.nonce,
            record_len: record.record_len(),
        }
    }

    /// Record length in bytes.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn record_bits(&self) -> u64 {
        self.record_len as u64 * 8
    }

    /// Unit just past this record; the next layer starts here.
    pub fn end_bits(&self) -> u64 {
        self.offset_bits + self.record_bits()
    }

    /// Stable identifier of the layer.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.nonce)
    }
}
