//! MAC address type with safe parsing and formatting.

use crate::ParseError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// Parsing accepts the common textual forms: colon- or hyphen-separated
/// octets, Cisco dotted groups, and a bare hex string.
///
/// # Examples
///
/// ```
/// use nbr_types::MacAddress;
///
/// let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
/// assert_eq!("aabb.ccdd.eeff".parse::<MacAddress>().unwrap(), mac);
/// assert_eq!("aabbccddeeff".parse::<MacAddress>().unwrap(), mac);
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The broadcast MAC address (ff:ff:ff:ff:ff:ff).
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// The all-zero MAC address.
    ///
    /// Kernel neighbor events carry a zero MAC while a binding is still
    /// unresolved.
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    /// Creates a MAC address from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    /// The six octets of the address.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Returns true for group (multicast and broadcast) addresses.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Returns true for the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// Returns true for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(':')?;
            }
            write!(f, "{octet:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    /// Decodes hex digits in one pass; `:`, `-` and `.` are accepted as
    /// group separators on octet boundaries only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseError::InvalidMacAddress(s.to_string());

        let mut octets = [0u8; 6];
        let mut nibbles = 0usize;
        for c in s.chars() {
            match c.to_digit(16) {
                Some(digit) => {
                    if nibbles == 12 {
                        return Err(bad());
                    }
                    octets[nibbles / 2] = octets[nibbles / 2] << 4 | digit as u8;
                    nibbles += 1;
                }
                None if matches!(c, ':' | '-' | '.') && nibbles % 2 == 0 && nibbles != 0 => {}
                None => return Err(bad()),
            }
        }
        if nibbles != 12 {
            return Err(bad());
        }
        Ok(MacAddress(octets))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_separated_forms() {
        let expected = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        for form in ["00:11:22:33:44:55", "00-11-22-33-44-55", "0011.2233.4455"] {
            assert_eq!(form.parse::<MacAddress>().unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_bare_hex() {
        let mac: MacAddress = "aabbccddeeff".parse().unwrap();
        assert_eq!(mac.octets(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn test_display_round_trip() {
        let mac = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(mac.to_string().parse::<MacAddress>().unwrap(), mac);
    }

    #[test]
    fn test_classification() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(MacAddress::BROADCAST.is_multicast());
        assert!(MacAddress::ZERO.is_zero());
        assert!(!MacAddress::ZERO.is_broadcast());
        let multicast: MacAddress = "01:00:5e:00:00:01".parse().unwrap();
        assert!(multicast.is_multicast());
        assert!(!multicast.is_broadcast());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in [
            "",
            "not a mac",
            "00:11:22:33:44",
            "00:11:22:33:44:55:66",
            "0:011:22:33:44:55",
            "00:11:22:33:44:5g",
            ":00:11:22:33:44:55",
        ] {
            assert!(bad.parse::<MacAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_serde_string_form() {
        let mac = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"00:11:22:33:44:55\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
        assert!(serde_json::from_str::<MacAddress>("\"nope\"").is_err());
    }
}
