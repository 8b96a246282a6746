//! Payload framing.
//!
//! One layer is stored as a single self-describing record:
//!
//! ```text
//! [MAGIC:4][VERSION:1][CONTENT_TYPE:1][FILENAME_LEN:2][FILENAME]
//! [PAYLOAD_LEN:4][NONCE:12][CIPHERTEXT][TAG:16][CHECKSUM:4]
//! ```
//!
//! Integers are big-endian. Everything up to and including the nonce is the
//! AEAD associated data; the checksum covers every preceding byte.

mod decoder;
mod encoder;
mod payload;

pub use decoder::{decode, declared_payload_len, has_magic, parse_prefix, DecodedRecord, RecordPrefix};
pub use encoder::{checksum, encode, finish_record, header_bytes, record_len};
pub use payload::{sanitize_filename, sniff_extension, ContentType, Payload};
