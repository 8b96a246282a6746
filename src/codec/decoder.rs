//! Layer record decoding and validation.

use crate::codec::encoder::{checksum, record_len};
use crate::codec::payload::{sanitize_filename, ContentType, Payload};
use crate::config::{
    CHECKSUM_SIZE, LAYER_MAGIC, LAYER_VERSION, NONCE_SIZE, PAYLOAD_LEN_SIZE, PREFIX_SIZE, TAG_SIZE,
};
use crate::crypto::{LayerKey, SealedFrame};
use crate::error::{Error, Result};

/// Fixed leading fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPrefix {
    pub version: u8,
    pub content_type: ContentType,
    pub filename_len: usize,
}

impl RecordPrefix {
    /// Bytes from `MAGIC` through `NONCE`.
    pub fn header_len(&self) -> usize {
        PREFIX_SIZE + self.filename_len + PAYLOAD_LEN_SIZE + NONCE_SIZE
    }
}

/// Returns `true` if `bytes` starts with the layer magic.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&LAYER_MAGIC)
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::FrameCorrupt(msg.into())
}

/// Parse and validate the first [`PREFIX_SIZE`] bytes of a record.
pub fn parse_prefix(bytes: &[u8]) -> Result<RecordPrefix> {
    if bytes.len() < PREFIX_SIZE {
        return Err(corrupt("record shorter than its prefix"));
    }
    if !has_magic(bytes) {
        return Err(corrupt("bad magic"));
    }
    let version = bytes[4];
    if version != LAYER_VERSION {
        return Err(corrupt(format!("unsupported record version {}", version)));
    }
    let content_type = ContentType::from_tag(bytes[5])
        .ok_or_else(|| corrupt(format!("unknown content type tag {}", bytes[5])))?;
    let filename_len = u16::from_be_bytes([bytes[6], bytes[7]]) as usize;

    Ok(RecordPrefix {
        version,
        content_type,
        filename_len,
    })
}

/// Read the declared payload length from a full header.
pub fn declared_payload_len(prefix: &RecordPrefix, header: &[u8]) -> Result<u32> {
    let at = PREFIX_SIZE + prefix.filename_len;
    let field = header
        .get(at..at + PAYLOAD_LEN_SIZE)
        .ok_or_else(|| corrupt("header shorter than declared filename"))?;
    Ok(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
}

/// A structurally valid, still sealed layer record.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub version: u8,
    pub content_type: ContentType,
    /// Sanitised filename; `None` when absent or unusable.
    pub filename: Option<String>,
    pub payload_len: u32,
    /// Associated data the frame was sealed with.
    pub header: Vec<u8>,
    pub sealed: SealedFrame,
}

impl DecodedRecord {
    /// Bytes this record occupies.
    pub fn record_len(&self) -> usize {
        self.header.len() + self.payload_len as usize + TAG_SIZE + CHECKSUM_SIZE
    }

    /// Verify and decrypt the record into a payload.
    pub fn open(&self, key: &LayerKey) -> Result<Payload> {
        let content = key.open(&self.header, &self.sealed)?;
        Ok(Payload {
            content,
            filename: self.filename.clone(),
            content_type: self.content_type,
        })
    }
}

/// Decode one record from the start of `bytes`.
///
/// Checks, in order: magic, version, content type, filename encoding, the
/// declared length against the bytes available, and the checksum. Trailing
/// bytes after the record are ignored.
pub fn decode(bytes: &[u8]) -> Result<DecodedRecord> {
    let prefix = parse_prefix(bytes)?;

    let name_end = PREFIX_SIZE + prefix.filename_len;
    let name_bytes = bytes
        .get(PREFIX_SIZE..name_end)
        .ok_or_else(|| corrupt("declared filename exceeds remaining stream"))?;
    let filename = if name_bytes.is_empty() {
        None
    } else {
        let name = std::str::from_utf8(name_bytes).map_err(|_| corrupt("filename is not UTF-8"))?;
        sanitize_filename(name).ok()
    };

    let header_len = prefix.header_len();
    if bytes.len() < header_len {
        return Err(corrupt("header exceeds remaining stream"));
    }
    let payload_len = declared_payload_len(&prefix, bytes)?;
    let total = record_len(prefix.filename_len, payload_len as usize);
    if bytes.len() < total {
        return Err(corrupt(format!(
            "declared length {} exceeds remaining stream of {} bytes",
            total,
            bytes.len()
        )));
    }

    let body_end = total - CHECKSUM_SIZE;
    if checksum(&bytes[..body_end]) != bytes[body_end..total] {
        return Err(corrupt("checksum mismatch"));
    }

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&bytes[header_len - NONCE_SIZE..header_len]);
    let cipher_end = header_len + payload_len as usize;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&bytes[cipher_end..cipher_end + TAG_SIZE]);

    Ok(DecodedRecord {
        version: prefix.version,
        content_type: prefix.content_type,
        filename,
        payload_len,
        header: bytes[..header_len].to_vec(),
        sealed: SealedFrame {
            nonce,
            ciphertext: bytes[header_len..cipher_end].to_vec(),
            tag,
        },
    })
}
