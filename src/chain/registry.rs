//! Layer registry: scanning, appending and trial decryption over one carrier.

use crate::cancel::CancelToken;
use crate::capacity::Capacity;
use crate::carrier::bits::{read_bytes, write_bytes};
use crate::carrier::CarrierAdapter;
use crate::chain::LayerHeader;
use crate::codec::{self, DecodedRecord, Payload};
use crate::config::{KdfParams, PREFIX_SIZE};
use crate::crypto::{LayerKey, Password};
use crate::error::{Error, Result};

/// Where the chain ends and how many layers precede that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    pub end_bits: u64,
    pub layer_count: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    offset: u64,
    index: usize,
    done: bool,
}

/// Layer chain of one open carrier.
pub struct LayerRegistry<'a> {
    carrier: &'a mut dyn CarrierAdapter,
    capacity: Capacity,
    max_layers: usize,
    cancel: CancelToken,
}

impl<'a> LayerRegistry<'a> {
    pub fn new(carrier: &'a mut dyn CarrierAdapter, capacity: Capacity, max_layers: usize) -> Self {
        Self {
            carrier,
            capacity,
            max_layers,
            cancel: CancelToken::new(),
        }
    }

    /// Check `cancel` during long reads and writes.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    /// Lazily enumerate layer headers in chain order. No password is needed.
    pub fn layers(&mut self) -> Layers<'_, 'a> {
        Layers {
            registry: self,
            cursor: Cursor::default(),
        }
    }

    /// Scan to the end of the chain.
    pub fn chain_state(&mut self) -> Result<ChainState> {
        let mut cursor = Cursor::default();
        while self.next_record(&mut cursor)?.is_some() {}
        Ok(ChainState {
            end_bits: cursor.offset,
            layer_count: cursor.index,
        })
    }

    /// Unit just past the last valid layer; 0 for an empty chain.
    pub fn locate_chain_end(&mut self) -> Result<u64> {
        Ok(self.chain_state()?.end_bits)
    }

    /// Write an encoded layer record at the end of the chain.
    ///
    /// Fails with `TooManyLayers` when the chain is at its bound, and with
    /// `CarrierTooSmall` or `ChainFull` when the record does not fit in the
    /// safe bits left after the chain.
    pub fn append_layer(&mut self, record: &[u8]) -> Result<LayerHeader> {
        let decoded = codec::decode(record)?;
        let record_bits = record.len() as u64 * 8;
        let state = self.ensure_room(record_bits)?;

        write_bytes(&mut *self.carrier, state.end_bits, record, &self.cancel)?;
        log::debug!(
            "appended layer {} at bit {} ({} bits)",
            state.layer_count,
            state.end_bits,
            record_bits
        );

        Ok(LayerHeader::from_record(state.layer_count, state.end_bits, &decoded))
    }

    /// Check that a record of `record_bits` can be appended, without writing.
    pub fn ensure_room(&mut self, record_bits: u64) -> Result<ChainState> {
        let state = self.chain_state()?;
        if state.layer_count >= self.max_layers {
            return Err(Error::TooManyLayers {
                limit: self.max_layers,
            });
        }
        self.capacity.require(&*self.carrier, state.end_bits, record_bits)?;
        Ok(state)
    }

    /// Trial-decrypt layers in chain order and return the first that verifies.
    pub fn extract_layer(&mut self, password: &Password, kdf: &KdfParams) -> Result<(LayerHeader, Payload)> {
        let mut cursor = Cursor::default();
        while let Some((header, record)) = self.next_record(&mut cursor)? {
            self.cancel.check()?;
            let key = LayerKey::derive(password, record.sealed.nonce, kdf)?;
            match record.open(&key) {
                Ok(payload) => {
                    log::debug!("layer {} verified", header.index);
                    return Ok((header, payload));
                }
                Err(Error::AuthenticationFailed) => {
                    log::trace!("layer {} did not verify", header.index);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoMatchingLayer)
    }

    /// Read the record at the cursor, advancing it. `Ok(None)` marks the end
    /// of the chain; a record with valid magic that fails validation is
    /// `FrameCorrupt`.
    fn next_record(&mut self, cursor: &mut Cursor) -> Result<Option<(LayerHeader, DecodedRecord)>> {
        if cursor.done {
            return Ok(None);
        }
        cursor.done = true;

        if cursor.index >= self.max_layers {
            log::debug!("layer scan stopped at bound of {} layers", self.max_layers);
            return Ok(None);
        }
        let prefix_end = cursor.offset + PREFIX_SIZE as u64 * 8;
        if prefix_end > self.capacity.safe_bits {
            return Ok(None);
        }

        let unit_count = self.carrier.unit_count();
        let prefix_bytes = read_bytes(&mut *self.carrier, cursor.offset, PREFIX_SIZE, &self.cancel)?;
        if !codec::has_magic(&prefix_bytes) {
            return Ok(None);
        }
        let prefix = codec::parse_prefix(&prefix_bytes)?;

        let header_len = prefix.header_len() as u64;
        if cursor.offset + header_len * 8 > unit_count {
            return Err(Error::FrameCorrupt(format!(
                "layer {} header runs past the end of the carrier",
                cursor.index
            )));
        }
        let header = read_bytes(&mut *self.carrier, cursor.offset, header_len as usize, &self.cancel)?;
        let payload_len = codec::declared_payload_len(&prefix, &header)?;
        let total = codec::record_len(prefix.filename_len, payload_len as usize);

        let available = (unit_count - cursor.offset) / 8;
        if total as u64 > available {
            return Err(Error::FrameCorrupt(format!(
                "layer {} declares {} bytes but only {} remain",
                cursor.index, total, available
            )));
        }

        let bytes = read_bytes(&mut *self.carrier, cursor.offset, total, &self.cancel)?;
        let record = codec::decode(&bytes)?;
        let layer = LayerHeader::from_record(cursor.index, cursor.offset, &record);
        log::trace!(
            "layer {} at bit {}: {} bytes, {}",
            layer.index,
            layer.offset_bits,
            total,
            layer.content_type
        );

        cursor.offset = layer.end_bits();
        cursor.index += 1;
        cursor.done = false;
        Ok(Some((layer, record)))
    }
}

/// Lazy iterator over layer headers.
pub struct Layers<'r, 'a> {
    registry: &'r mut LayerRegistry<'a>,
    cursor: Cursor,
}

impl Iterator for Layers<'_, '_> {
    type Item = Result<LayerHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.registry.next_record(&mut self.cursor) {
            Ok(Some((header, _))) => Some(Ok(header)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
