//! Capacity estimation and fit validation.
//!
//! A carrier's raw capacity is one bit per elementary unit. Only a share of
//! it, the safe bits, may hold layers; the rest is left untouched to limit
//! detectability and playback artefacts.

use crate::carrier::{CarrierAdapter, MediaKind, SizingGuidance};
use crate::config::{ReservedFractions, LAYER_OVERHEAD};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bit budget of one carrier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    pub media_kind: MediaKind,
    /// One bit per elementary unit.
    pub total_bits: u64,
    /// Bits layers may occupy, counted from unit 0.
    pub safe_bits: u64,
    /// Fraction used to derive `safe_bits`.
    pub fraction: f64,
}

impl Capacity {
    pub fn new(media_kind: MediaKind, total_bits: u64, fraction: f64) -> Self {
        Self {
            media_kind,
            total_bits,
            safe_bits: safe_bits(total_bits, fraction),
            fraction,
        }
    }

    /// Estimate the capacity of an open carrier.
    pub fn of(carrier: &dyn CarrierAdapter, fractions: &ReservedFractions) -> Self {
        let kind = carrier.media_kind();
        Self::new(kind, carrier.unit_count(), fractions.for_kind(kind))
    }

    /// Safe bits left after a chain ending at `chain_end_bits`.
    pub fn remaining_bits(&self, chain_end_bits: u64) -> u64 {
        self.safe_bits.saturating_sub(chain_end_bits)
    }

    /// Largest payload, in bytes, that still fits after the chain with a
    /// filename of `filename_len` bytes.
    pub fn max_payload_bytes(&self, chain_end_bits: u64, filename_len: usize) -> u64 {
        let remaining_bytes = self.remaining_bits(chain_end_bits) / 8;
        remaining_bytes
            .saturating_sub((LAYER_OVERHEAD + filename_len) as u64)
            .min(u32::MAX as u64)
    }

    /// Validate a new layer of `payload_bits` against this carrier, attaching
    /// sizing guidance when it does not fit.
    pub fn check(&self, carrier: &dyn CarrierAdapter, chain_end_bits: u64, payload_bits: u64) -> FitCheck {
        let mut fit = check_fits(chain_end_bits, payload_bits, self.safe_bits);
        if !fit.fits {
            let needed = chain_end_bits.saturating_add(payload_bits);
            fit.sizing_guidance = Some(carrier.sizing_guidance(required_units(needed, self.fraction)));
        }
        fit
    }

    /// Like [`check`](Self::check), failing with `CarrierTooSmall` on an empty
    /// chain and `ChainFull` when layers already exist.
    pub fn require(&self, carrier: &dyn CarrierAdapter, chain_end_bits: u64, payload_bits: u64) -> Result<()> {
        let fit = self.check(carrier, chain_end_bits, payload_bits);
        let guidance = match fit.sizing_guidance {
            None => return Ok(()),
            Some(guidance) => guidance,
        };

        let available_bits = self.remaining_bits(chain_end_bits);
        log::debug!(
            "layer of {} bits does not fit: {} safe bits left after chain end {}",
            payload_bits,
            available_bits,
            chain_end_bits
        );

        if chain_end_bits == 0 {
            Err(Error::CarrierTooSmall {
                needed_bits: payload_bits,
                available_bits,
                guidance,
            })
        } else {
            Err(Error::ChainFull {
                needed_bits: payload_bits,
                available_bits,
                guidance,
            })
        }
    }
}

/// Outcome of a fit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCheck {
    pub fits: bool,
    /// Missing bits; 0 when the layer fits.
    pub shortfall_bits: u64,
    /// Minimum carrier that would fit, when a carrier was consulted.
    pub sizing_guidance: Option<SizingGuidance>,
}

/// Check whether `payload_bits` more bits fit after `chain_end_bits` within
/// `safe_bits`. A layer ending exactly at `safe_bits` fits.
pub fn check_fits(chain_end_bits: u64, payload_bits: u64, safe_bits: u64) -> FitCheck {
    let end = chain_end_bits.saturating_add(payload_bits);
    let shortfall_bits = end.saturating_sub(safe_bits);
    FitCheck {
        fits: shortfall_bits == 0,
        shortfall_bits,
        sizing_guidance: None,
    }
}

/// `floor(total_bits * fraction)`, never more than `total_bits`.
pub fn safe_bits(total_bits: u64, fraction: f64) -> u64 {
    ((total_bits as f64 * fraction).floor() as u64).min(total_bits)
}

/// Smallest unit count whose safe bits cover `bits`.
pub fn required_units(bits: u64, fraction: f64) -> u64 {
    if fraction <= 0.0 {
        return u64::MAX;
    }
    let mut units = (bits as f64 / fraction).ceil() as u64;
    while safe_bits(units, fraction) < bits {
        units += 1;
    }
    while units > 0 && safe_bits(units - 1, fraction) >= bits {
        units -= 1;
    }
    units
}
