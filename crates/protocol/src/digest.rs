//! Authentication digests for Stower peripherals.
//!
//! Both device families authenticate the app by checking an MD5 digest over
//! the device's own address in **reversed** octet order plus a fixed product
//! salt. Inverters additionally mix in an expiry timestamp and receive it
//! alongside the digest, so a captured payload stops working once the expiry
//! passes.

use md5::{Digest as _, Md5};

use crate::mac::MacAddr;

/// Product salt appended to every digest input.
pub const AUTH_SALT: &[u8] = b"StowerBatteryNode-Inventech";

/// Digest length in bytes (MD5).
pub const DIGEST_LEN: usize = 16;

/// Length of the inverter authentication payload: digest plus expiry.
pub const INVERTER_AUTH_LEN: usize = DIGEST_LEN + 8;

/// Compute the battery-node digest: `MD5(reversed address ‖ salt)`.
#[must_use]
pub fn node_digest(addr: MacAddr) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    hasher.update(addr.reversed());
    hasher.update(AUTH_SALT);
    hasher.finalize().into()
}

/// Compute the inverter digest:
/// `MD5(reversed address ‖ expiry as u64 LE ‖ salt)`.
///
/// `expiry_ms` is an epoch timestamp in milliseconds. The single
/// little-endian u64 write is byte-identical to the firmware's packing of
/// the low and high 32-bit halves.
#[must_use]
pub fn inverter_digest(addr: MacAddr, expiry_ms: u64) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    hasher.update(addr.reversed());
    hasher.update(expiry_ms.to_le_bytes());
    hasher.update(AUTH_SALT);
    hasher.finalize().into()
}

/// Build the 24-byte payload for the inverter authentication characteristic:
/// digest followed by the expiry as u64 LE.
///
/// The firmware recomputes the digest from its own address and the received
/// expiry, so the two parts must agree.
#[must_use]
pub fn inverter_auth_payload(addr: MacAddr, expiry_ms: u64) -> [u8; INVERTER_AUTH_LEN] {
    let mut payload = [0u8; INVERTER_AUTH_LEN];
    payload[..DIGEST_LEN].copy_from_slice(&inverter_digest(addr, expiry_ms));
    payload[DIGEST_LEN..].copy_from_slice(&expiry_ms.to_le_bytes());
    payload
}
