//! Core types for neighbor management.
//!
//! Payload structs are fully decoded before they reach the processor; no
//! wire parsing happens past the ingress boundary.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-8: System Component Inventory - Neighbor entries as network components
//! - SI-4: System Monitoring - Neighbor state tracking
//! - IA-3: Device Identification - MAC addresses per neighbor entry

use bitflags::bitflags;
use nbr_types::{Family, MacAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Kernel neighbor state (NUD_* values from linux/neighbour.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum NudState {
    /// No state observed yet (proactive-resolve entries start here)
    None = 0x00,
    /// Resolution in progress
    Incomplete = 0x01,
    /// Neighbor is reachable
    Reachable = 0x02,
    /// Reachability has gone stale
    Stale = 0x04,
    /// Resolution delayed
    Delay = 0x08,
    /// Probe in progress
    Probe = 0x10,
    /// Resolution failed
    Failed = 0x20,
    /// No ARP needed (static or local)
    NoArp = 0x40,
    /// Permanent entry
    Permanent = 0x80,
}

impl NudState {
    /// Decodes a kernel NUD_* value.
    ///
    /// The kernel occasionally reports `REACHABLE|INCOMPLETE` (0x03) for an
    /// entry mid-transition; that combination is treated as `Reachable`.
    pub fn from_kernel(state: u16) -> Self {
        match state {
            0x00 => Self::None,
            0x01 => Self::Incomplete,
            0x02 | 0x03 => Self::Reachable,
            0x04 => Self::Stale,
            0x08 => Self::Delay,
            0x10 => Self::Probe,
            0x20 => Self::Failed,
            0x40 => Self::NoArp,
            0x80 => Self::Permanent,
            _ => Self::None,
        }
    }

    /// States that are meaningless without a previously known neighbor.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Delay | Self::Probe | Self::Failed)
    }

    /// States with a usable binding: the neighbor can be programmed with a
    /// forwarding MAC and refreshed with a unicast probe.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            Self::Reachable | Self::Stale | Self::Delay | Self::Permanent
        )
    }
}

impl fmt::Display for NudState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Incomplete => "INCOMPLETE",
            Self::Reachable => "REACHABLE",
            Self::Stale => "STALE",
            Self::Delay => "DELAY",
            Self::Probe => "PROBE",
            Self::Failed => "FAILED",
            Self::NoArp => "NOARP",
            Self::Permanent => "PERMANENT",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Per-neighbor control flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct NbrFlags: u32 {
        /// Proactive resolution requested by the control plane; the entry
        /// must survive kernel deletes while this is set.
        const RESOLVE = 0x01;
        /// A unicast refresh is in flight.
        const REFRESH = 0x02;
        /// Refreshing specifically to drive MAC learning in the NPU.
        const REFRESH_FOR_MAC_LEARN = 0x04;
        /// Published to the NPU without a confirmed MAC binding.
        const MAC_NOT_PRESENT = 0x08;
        /// A MAC mutation was observed on the latest event.
        const MAC_CHANGE = 0x10;
    }
}

bitflags! {
    /// What an interface event carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct IntfFlags: u32 {
        const ADMIN = 0x01;
        const VLAN = 0x02;
    }
}

/// A fully decoded neighbor or FDB event payload.
///
/// FDB events reuse this shape with `family == Bridge`; `ip` is unused
/// there and `mbr_if_index` carries the learned member port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbrEntry {
    pub vrf_id: u32,
    pub vrf_name: String,
    pub family: Family,
    pub ip: IpAddr,
    pub mac: MacAddress,
    pub ifindex: u32,
    /// Lower-layer L2 interface for bridged router interfaces (0 = none).
    pub parent_if: u32,
    /// Physical member port the FDB learned the MAC on (0 = unknown).
    pub mbr_if_index: u32,
    pub expire: u64,
    pub flags: NbrFlags,
    pub status: NudState,
    pub auto_refresh_on_stale: bool,
}

impl Default for NbrEntry {
    fn default() -> Self {
        Self {
            vrf_id: 0,
            vrf_name: String::new(),
            family: Family::Inet4,
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            mac: MacAddress::ZERO,
            ifindex: 0,
            parent_if: 0,
            mbr_if_index: 0,
            expire: 0,
            flags: NbrFlags::empty(),
            status: NudState::None,
            auto_refresh_on_stale: false,
        }
    }
}

/// A fully decoded interface event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntfEntry {
    pub vrf_id: u32,
    pub ifindex: u32,
    pub flags: IntfFlags,
    pub is_admin_up: bool,
    pub is_bridge: bool,
    pub vlan_id: u16,
    pub is_op_del: bool,
    /// Paired counterpart linking an L3 router interface with its L2
    /// lower layer (0/0 = unpaired).
    pub parent_or_child_vrf: u32,
    pub parent_or_child_ifindex: u32,
}

/// A flush request: one interface, a whole VRF (ifindex 0), or everything
/// (both zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlushRequest {
    pub vrf_id: u32,
    pub ifindex: u32,
}

/// A request to dump the caches, optionally restricted to one VRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DumpRequest {
    pub vrf_id: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nud_from_kernel() {
        assert_eq!(NudState::from_kernel(0x02), NudState::Reachable);
        assert_eq!(NudState::from_kernel(0x20), NudState::Failed);
        assert_eq!(NudState::from_kernel(0x00), NudState::None);
    }

    #[test]
    fn test_nud_reachable_incomplete_quirk() {
        // Kernel quirk: both bits set mid-transition
        assert_eq!(NudState::from_kernel(0x03), NudState::Reachable);
    }

    #[test]
    fn test_nud_predicates() {
        assert!(NudState::Probe.is_transient());
        assert!(NudState::Failed.is_transient());
        assert!(!NudState::Reachable.is_transient());

        assert!(NudState::Reachable.is_resolved());
        assert!(NudState::Stale.is_resolved());
        assert!(NudState::Permanent.is_resolved());
        assert!(!NudState::Incomplete.is_resolved());
        assert!(!NudState::Failed.is_resolved());
    }

    #[test]
    fn test_nbr_flags() {
        let mut flags = NbrFlags::RESOLVE | NbrFlags::REFRESH;
        assert!(flags.contains(NbrFlags::RESOLVE));
        flags.remove(NbrFlags::REFRESH);
        assert!(!flags.contains(NbrFlags::REFRESH));
        assert_eq!(NbrFlags::default(), NbrFlags::empty());
    }

    #[test]
    fn test_entry_default() {
        let entry = NbrEntry::default();
        assert_eq!(entry.status, NudState::None);
        assert!(entry.mac.is_zero());
        assert_eq!(entry.family, Family::Inet4);
    }
}
