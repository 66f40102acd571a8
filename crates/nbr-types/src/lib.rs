//! Leaf types shared across the neighbor manager.
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`Family`]: address family of a neighbor entry

mod family;
mod mac;

pub use family::Family;
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("`{0}` is not a valid MAC address")]
    InvalidMacAddress(String),

    #[error("`{0}` is not a known address family")]
    InvalidFamily(String),
}
