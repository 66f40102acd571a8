//! Interface cache.

use crate::types::IntfEntry;
use serde::Serialize;
use std::collections::HashMap;

/// Cached interface state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub vrf_id: u32,
    pub ifindex: u32,
    pub is_admin_up: bool,
    pub is_bridge: bool,
    pub vlan_id: u16,
    /// Counterpart (vrf, ifindex) pairing an L3 router interface with its
    /// L2 lower layer. Kept symmetric by the processor.
    pub paired: Option<(u32, u32)>,
}

impl Interface {
    pub fn from_entry(entry: &IntfEntry) -> Self {
        let paired = if entry.parent_or_child_ifindex != 0 {
            Some((entry.parent_or_child_vrf, entry.parent_or_child_ifindex))
        } else {
            None
        };
        Self {
            vrf_id: entry.vrf_id,
            ifindex: entry.ifindex,
            is_admin_up: entry.is_admin_up,
            is_bridge: entry.is_bridge,
            vlan_id: entry.vlan_id,
            paired,
        }
    }

    /// Payload form, used for NPU notifications and dumps.
    pub fn to_entry(self) -> IntfEntry {
        let (pvrf, pif) = self.paired.unwrap_or((0, 0));
        IntfEntry {
            vrf_id: self.vrf_id,
            ifindex: self.ifindex,
            flags: Default::default(),
            is_admin_up: self.is_admin_up,
            is_bridge: self.is_bridge,
            vlan_id: self.vlan_id,
            is_op_del: false,
            parent_or_child_vrf: pvrf,
            parent_or_child_ifindex: pif,
        }
    }
}

/// The interface store, keyed by (vrf, ifindex).
#[derive(Debug, Default)]
pub struct InterfaceStore {
    entries: HashMap<(u32, u32), Interface>,
}

impl InterfaceStore {
    pub fn get(&self, vrf_id: u32, ifindex: u32) -> Option<&Interface> {
        self.entries.get(&(vrf_id, ifindex))
    }

    pub fn get_mut(&mut self, vrf_id: u32, ifindex: u32) -> Option<&mut Interface> {
        self.entries.get_mut(&(vrf_id, ifindex))
    }

    pub fn insert(&mut self, intf: Interface) {
        self.entries.insert((intf.vrf_id, intf.ifindex), intf);
    }

    pub fn remove(&mut self, vrf_id: u32, ifindex: u32) -> Option<Interface> {
        self.entries.remove(&(vrf_id, ifindex))
    }

    /// Admin status of an interface; absent interfaces count as down.
    pub fn is_admin_up(&self, vrf_id: u32, ifindex: u32) -> bool {
        self.get(vrf_id, ifindex).is_some_and(|i| i.is_admin_up)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn up_intf(vrf_id: u32, ifindex: u32) -> Interface {
        Interface {
            vrf_id,
            ifindex,
            is_admin_up: true,
            is_bridge: false,
            vlan_id: 0,
            paired: None,
        }
    }

    #[test]
    fn test_admin_up_absent_is_down() {
        let mut store = InterfaceStore::default();
        assert!(!store.is_admin_up(0, 5));

        store.insert(up_intf(0, 5));
        assert!(store.is_admin_up(0, 5));

        store.get_mut(0, 5).unwrap().is_admin_up = false;
        assert!(!store.is_admin_up(0, 5));
    }

    #[test]
    fn test_entry_round_trip_pairing() {
        let entry = IntfEntry {
            vrf_id: 1,
            ifindex: 7,
            is_admin_up: true,
            parent_or_child_vrf: 0,
            parent_or_child_ifindex: 9,
            ..Default::default()
        };
        let intf = Interface::from_entry(&entry);
        assert_eq!(intf.paired, Some((0, 9)));
        let back = intf.to_entry();
        assert_eq!(back.parent_or_child_ifindex, 9);

        let unpaired = Interface::from_entry(&IntfEntry::default());
        assert_eq!(unpaired.paired, None);
    }
}
