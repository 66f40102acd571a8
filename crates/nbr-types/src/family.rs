//! Address family of a neighbor entry.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Address family carried in neighbor and FDB events.
///
/// `Bridge` identifies L2 FDB entries; IP neighbors are `Inet4` or `Inet6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Inet4,
    Inet6,
    Bridge,
}

impl Family {
    /// The family an IP address belongs to.
    pub fn from_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::Inet4,
            IpAddr::V6(_) => Family::Inet6,
        }
    }

    /// Returns true for the two IP families.
    pub fn is_ip(&self) -> bool {
        matches!(self, Family::Inet4 | Family::Inet6)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Family::Inet4 => "IPv4",
            Family::Inet6 => "IPv6",
            Family::Bridge => "Bridge",
        };
        f.write_str(s)
    }
}

impl FromStr for Family {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" | "IPv4" | "inet4" => Ok(Family::Inet4),
            "ipv6" | "IPv6" | "inet6" => Ok(Family::Inet6),
            "bridge" | "Bridge" => Ok(Family::Bridge),
            _ => Err(ParseError::InvalidFamily(s.to_string())),
        }
    }
}
