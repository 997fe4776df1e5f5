//! Little-endian framing helpers for the file-transfer response stream.

use crate::error::ProtocolError;

/// Encode a u32 as 4 little-endian bytes (the size-prefix / status encoding).
#[must_use]
pub fn pack_u32_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode a little-endian u32 from the first 4 bytes of `buf`. Trailing
/// bytes are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedBuffer`] when `buf` holds fewer than
/// 4 bytes.
pub fn unpack_u32_le(buf: &[u8]) -> Result<u32, ProtocolError> {
    if buf.len() < 4 {
        return Err(ProtocolError::TruncatedBuffer {
            record: "u32 word",
            expected: 4,
            actual: buf.len(),
        });
    }
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_u32_values() {
        for value in [0u32, 1, 0x0000_1234, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(unpack_u32_le(&pack_u32_le(value)).unwrap(), value);
        }
    }

    #[test]
    fn should_pack_little_endian() {
        assert_eq!(pack_u32_le(0x0102_0304), [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn should_ignore_trailing_bytes() {
        let buf = [0x0A, 0x00, 0x00, 0x00, 0xFF, 0xFF];
        assert_eq!(unpack_u32_le(&buf).unwrap(), 10);
    }

    #[test]
    fn should_reject_short_buffer() {
        let err = unpack_u32_le(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedBuffer {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }
}
