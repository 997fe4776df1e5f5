//! Battery enrollment payload.
//!
//! The inverter learns its attached battery nodes from one fixed-size write:
//! a count byte, the logging interval, then sixteen 6-byte MAC slots in the
//! listed order. Unused slots stay zeroed. The firmware rejects writes of
//! any other length, so the payload is always 98 bytes no matter how many
//! batteries are present.

use crate::error::ProtocolError;
use crate::mac::MacAddr;

/// Number of MAC slots in the payload.
pub const MAX_BATTERIES: usize = 16;

/// Total payload length: count byte, log interval, then the MAC slots.
pub const ENROLLMENT_LEN: usize = 2 + MAX_BATTERIES * 6;

/// Build the enrollment payload for the given battery addresses.
///
/// `log_interval` is the telemetry logging interval in minutes.
///
/// # Errors
///
/// Returns [`ProtocolError::TooManyBatteries`] when more than
/// [`MAX_BATTERIES`] addresses are supplied.
pub fn build_enrollment_payload(
    batteries: &[MacAddr],
    log_interval: u8,
) -> Result<[u8; ENROLLMENT_LEN], ProtocolError> {
    let count = u8::try_from(batteries.len())
        .ok()
        .filter(|count| usize::from(*count) <= MAX_BATTERIES)
        .ok_or(ProtocolError::TooManyBatteries {
            count: batteries.len(),
        })?;

    let mut payload = [0u8; ENROLLMENT_LEN];
    payload[0] = count;
    payload[1] = log_interval;
    for (slot, battery) in batteries.iter().enumerate() {
        let offset = 2 + slot * 6;
        payload[offset..offset + 6].copy_from_slice(&battery.octets());
    }
    Ok(payload)
}
