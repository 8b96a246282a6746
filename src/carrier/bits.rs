//! Byte-level access on top of per-unit bit access.
//!
//! Bytes are laid out MSB-first, one bit per elementary unit.

use crate::cancel::CancelToken;
use crate::carrier::CarrierAdapter;
use crate::error::{Error, Result};

/// Bytes processed between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 512;

fn check_span(carrier: &dyn CarrierAdapter, start_bit: u64, len: usize) -> Result<()> {
    let count = carrier.unit_count();
    let end = start_bit
        .checked_add(len as u64 * 8)
        .ok_or(Error::UnitOutOfRange { index: u64::MAX, count })?;
    if end > count {
        return Err(Error::UnitOutOfRange {
            index: end - 1,
            count,
        });
    }
    Ok(())
}

/// Read `len` bytes starting at unit `start_bit`.
pub fn read_bytes(
    carrier: &mut dyn CarrierAdapter,
    start_bit: u64,
    len: usize,
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    check_span(carrier, start_bit, len)?;

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        let base = start_bit + i as u64 * 8;
        let mut byte = 0u8;
        for bit in 0..8 {
            byte = (byte << 1) | (carrier.read_bit(base + bit)? & 1);
        }
        out.push(byte);
    }
    Ok(out)
}

/// Write `bytes` starting at unit `start_bit`.
pub fn write_bytes(
    carrier: &mut dyn CarrierAdapter,
    start_bit: u64,
    bytes: &[u8],
    cancel: &CancelToken,
) -> Result<()> {
    check_span(carrier, start_bit, bytes.len())?;

    for (i, byte) in bytes.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        let base = start_bit + i as u64 * 8;
        for bit in 0..8 {
            let value = (byte >> (7 - bit)) & 1;
            carrier.write_bit(base + bit, value)?;
        }
    }
    Ok(())
}
