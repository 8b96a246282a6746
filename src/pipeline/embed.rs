//! Embed pipeline over an open carrier.

use crate::cancel::CancelToken;
use crate::capacity::Capacity;
use crate::carrier::CarrierAdapter;
use crate::chain::{LayerHeader, LayerRegistry};
use crate::codec::{self, Payload};
use crate::config::StegoConfig;
use crate::crypto::{LayerKey, Password};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outcome of a successful embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedReport {
    /// The layer just written.
    pub layer: LayerHeader,
    pub capacity: Capacity,
    /// Chain end after the new layer.
    pub chain_end_bits: u64,
}

impl EmbedReport {
    /// Safe bits still free after this embed.
    pub fn remaining_bits(&self) -> u64 {
        self.capacity.remaining_bits(self.chain_end_bits)
    }
}

/// Append `payload` as a new layer to an open carrier.
///
/// The fit is checked before the key is derived. Nothing is written unless
/// every check passes; a cancelled or failed write leaves only the in-memory
/// carrier modified, never a saved artifact.
pub(crate) fn embed_into(
    carrier: &mut dyn CarrierAdapter,
    payload: &Payload,
    password: &Password,
    config: &StegoConfig,
    cancel: &CancelToken,
) -> Result<EmbedReport> {
    let capacity = Capacity::of(&*carrier, &config.reserved);
    let mut registry = LayerRegistry::new(carrier, capacity, config.max_layers).with_cancel(cancel.clone());

    let filename_len = payload.filename_bytes()?.len();
    let record_bits = codec::record_len(filename_len, payload.content.len()) as u64 * 8;
    let state = registry.ensure_room(record_bits)?;
    log::debug!(
        "embedding {} layer of {} bits after {} existing layer(s)",
        payload.content_type,
        record_bits,
        state.layer_count
    );

    cancel.check()?;
    let key = LayerKey::generate(password, &config.kdf)?;
    let record = codec::encode(payload, key)?;
    let layer = registry.append_layer(&record)?;

    Ok(EmbedReport {
        chain_end_bits: layer.end_bits(),
        layer,
        capacity,
    })
}
