//! Device MAC addresses — parsing, formatting, and the octet reversal used
//! by the authentication digests.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// A 6-byte BLE device address.
///
/// Displays as colon-separated uppercase hex (`A4:C1:38:5B:0E:DF`); parsing
/// accepts either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Wrap raw address bytes in transmission order.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The address bytes in transmission order.
    #[must_use]
    pub const fn octets(self) -> [u8; 6] {
        self.0
    }

    /// The address bytes in reversed octet order.
    ///
    /// The authentication digests hash the address reversed; applying the
    /// reversal twice recovers the original order.
    #[must_use]
    pub const fn reversed(self) -> [u8; 6] {
        let o = self.0;
        [o[5], o[4], o[3], o[2], o[1], o[0]]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = ProtocolError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidAddress(input.to_owned());

        let mut octets = [0u8; 6];
        let mut parts = input.split(':');
        for slot in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            // `from_str_radix` tolerates a leading sign, so check the shape first.
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_uppercase_address() {
        let mac: MacAddr = "A4:C1:38:5B:0E:DF".parse().unwrap();
        assert_eq!(mac.octets(), [0xA4, 0xC1, 0x38, 0x5B, 0x0E, 0xDF]);
    }

    #[test]
    fn should_parse_lowercase_address() {
        let mac: MacAddr = "a4:c1:38:5b:0e:df".parse().unwrap();
        assert_eq!(mac.octets(), [0xA4, 0xC1, 0x38, 0x5B, 0x0E, 0xDF]);
    }

    #[test]
    fn should_roundtrip_through_display() {
        let mac = MacAddr::new([0x10, 0x52, 0x1C, 0x02, 0x99, 0x41]);
        assert_eq!(mac.to_string(), "10:52:1C:02:99:41");
        assert_eq!(mac.to_string().parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn should_reject_too_few_octets() {
        assert!("A4:C1:38:5B:0E".parse::<MacAddr>().is_err());
    }

    #[test]
    fn should_reject_too_many_octets() {
        assert!("A4:C1:38:5B:0E:DF:01".parse::<MacAddr>().is_err());
    }

    #[test]
    fn should_reject_non_hex_octet() {
        assert!("A4:C1:38:5B:0E:ZZ".parse::<MacAddr>().is_err());
    }

    #[test]
    fn should_reject_signed_octet() {
        // `u8::from_str_radix` would accept "+F" on its own.
        assert!("A4:C1:38:5B:0E:+F".parse::<MacAddr>().is_err());
    }

    #[test]
    fn should_reject_wrong_octet_width() {
        assert!("A4:C1:38:5B:0E:DFF".parse::<MacAddr>().is_err());
        assert!("A4:C1:38:5B:0E:D".parse::<MacAddr>().is_err());
    }

    #[test]
    fn should_reverse_octet_order() {
        let mac = MacAddr::new([0xA4, 0xC1, 0x38, 0x5B, 0x0E, 0xDF]);
        assert_eq!(mac.reversed(), [0xDF, 0x0E, 0x5B, 0x38, 0xC1, 0xA4]);
    }

    #[test]
    fn should_recover_order_by_reversing_twice() {
        let mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        assert_eq!(MacAddr::new(mac.reversed()).reversed(), mac.octets());
    }
}
