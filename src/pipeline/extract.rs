//! Extract pipeline over an open carrier.

use crate::cancel::CancelToken;
use crate::capacity::Capacity;
use crate::carrier::CarrierAdapter;
use crate::chain::{LayerHeader, LayerRegistry};
use crate::codec::Payload;
use crate::config::StegoConfig;
use crate::crypto::Password;
use crate::error::{Error, Result};

/// Find and open the first layer that verifies under `password`.
///
/// "No layers" and "no layer verified" both surface as
/// `WrongPasswordOrNoHiddenData`. A damaged chain is reported as
/// `FrameCorrupt`.
pub(crate) fn extract_from(
    carrier: &mut dyn CarrierAdapter,
    password: &Password,
    config: &StegoConfig,
    cancel: &CancelToken,
) -> Result<(LayerHeader, Payload)> {
    let capacity = Capacity::of(&*carrier, &config.reserved);
    let mut registry = LayerRegistry::new(carrier, capacity, config.max_layers).with_cancel(cancel.clone());

    match registry.extract_layer(password, &config.kdf) {
        Err(Error::NoMatchingLayer) => Err(Error::WrongPasswordOrNoHiddenData),
        other => other,
    }
}

/// Headers of every layer in chain order.
pub(crate) fn list_from(
    carrier: &mut dyn CarrierAdapter,
    config: &StegoConfig,
    cancel: &CancelToken,
) -> Result<Vec<LayerHeader>> {
    let capacity = Capacity::of(&*carrier, &config.reserved);
    let mut registry = LayerRegistry::new(carrier, capacity, config.max_layers).with_cancel(cancel.clone());
    registry.layers().collect()
}
