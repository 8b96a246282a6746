//! Layer record encoding.

use crate::codec::payload::{ContentType, Payload};
use crate::config::{
    CHECKSUM_SIZE, LAYER_MAGIC, LAYER_OVERHEAD, LAYER_VERSION, NONCE_SIZE, PAYLOAD_LEN_SIZE, PREFIX_SIZE,
};
use crate::crypto::{LayerKey, SealedFrame};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Total record length for a filename and payload of the given sizes.
pub fn record_len(filename_len: usize, payload_len: usize) -> usize {
    LAYER_OVERHEAD + filename_len + payload_len
}

/// Truncated SHA-256 over `bytes`.
pub fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&digest[..CHECKSUM_SIZE]);
    out
}

/// Record header from `MAGIC` through `NONCE`. These bytes are the AEAD
/// associated data of the layer.
pub fn header_bytes(
    content_type: ContentType,
    filename: &[u8],
    payload_len: u32,
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>> {
    let filename_len = u16::try_from(filename.len())
        .map_err(|_| Error::InvalidPayload("filename too long".to_string()))?;

    let mut header = Vec::with_capacity(PREFIX_SIZE + filename.len() + PAYLOAD_LEN_SIZE + NONCE_SIZE);
    header.extend_from_slice(&LAYER_MAGIC);
    header.push(LAYER_VERSION);
    header.push(content_type.tag());
    header.extend_from_slice(&filename_len.to_be_bytes());
    header.extend_from_slice(filename);
    header.extend_from_slice(&payload_len.to_be_bytes());
    header.extend_from_slice(nonce);
    Ok(header)
}

/// Append the sealed frame and checksum to a header.
pub fn finish_record(mut header: Vec<u8>, sealed: &SealedFrame) -> Vec<u8> {
    header.reserve(sealed.ciphertext.len() + sealed.tag.len() + CHECKSUM_SIZE);
    header.extend_from_slice(&sealed.ciphertext);
    header.extend_from_slice(&sealed.tag);
    let sum = checksum(&header);
    header.extend_from_slice(&sum);
    header
}

/// Seal a payload under `key` and frame it as one layer record.
///
/// # Arguments
///
/// * `payload` - Content, filename and content type
/// * `key` - Key bound to a fresh nonce; consumed so the nonce is used once
///
/// # Returns
///
/// The complete record bytes, ready to be written bit by bit.
pub fn encode(payload: &Payload, key: LayerKey) -> Result<Vec<u8>> {
    let payload_len = u32::try_from(payload.content.len()).map_err(|_| {
        Error::InvalidPayload(format!("payload of {} bytes exceeds the 4 GiB limit", payload.content.len()))
    })?;
    let filename = payload.filename_bytes()?;

    let header = header_bytes(payload.content_type, filename, payload_len, key.nonce())?;
    let sealed = key.seal(&header, &payload.content)?;
    let record = finish_record(header, &sealed);

    debug_assert_eq!(record.len(), record_len(filename.len(), payload.content.len()));
    Ok(record)
}
