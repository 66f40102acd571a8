//! MAC (FDB) cache.

use super::neighbor::NbrRef;
use nbr_types::MacAddress;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Identity of a MAC entry: the bridge interface it was seen on plus the
/// address itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MacKey {
    pub ifindex: u32,
    pub mac: MacAddress,
}

impl MacKey {
    pub fn new(ifindex: u32, mac: MacAddress) -> Self {
        Self { ifindex, mac }
    }
}

/// How the FDB currently views a MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FdbType {
    /// Learned on a known member port.
    Learned,
    /// FDB reported the MAC without a member port; not usable.
    Ignore,
    /// Known to neighbors but not (or no longer) confirmed by the FDB.
    Incomplete,
}

/// A MAC entry plus the neighbors referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct MacEntry {
    pub key: MacKey,
    /// Physical member port the FDB learned the MAC on (0 = unknown).
    pub mbr_if_index: u32,
    pub fdb_type: FdbType,
    /// Back-list of neighbors resolved onto this MAC.
    pub nbrs: HashSet<NbrRef>,
}

impl MacEntry {
    fn new(key: MacKey) -> Self {
        Self {
            key,
            mbr_if_index: 0,
            fdb_type: FdbType::Incomplete,
            nbrs: HashSet::new(),
        }
    }

    /// A MAC is usable for forwarding only once the FDB confirmed it.
    pub fn is_valid(&self) -> bool {
        self.fdb_type == FdbType::Learned
    }

    pub fn nbr_list_empty(&self) -> bool {
        self.nbrs.is_empty()
    }
}

/// The MAC store.
#[derive(Debug, Default)]
pub struct MacStore {
    entries: HashMap<MacKey, MacEntry>,
}

impl MacStore {
    pub fn get(&self, key: &MacKey) -> Option<&MacEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &MacKey) -> Option<&mut MacEntry> {
        self.entries.get_mut(key)
    }

    /// Find-or-create; fresh entries start `Incomplete` with no port.
    pub fn get_or_create(&mut self, key: MacKey) -> &mut MacEntry {
        self.entries.entry(key).or_insert_with(|| MacEntry::new(key))
    }

    pub fn remove(&mut self, key: &MacKey) -> Option<MacEntry> {
        self.entries.remove(key)
    }

    /// Drops the entry if nothing references it and the FDB does not hold
    /// it as learned. Returns true if the entry was removed.
    pub fn gc(&mut self, key: &MacKey) -> bool {
        let removable = self
            .entries
            .get(key)
            .is_some_and(|m| m.nbr_list_empty() && !m.is_valid());
        if removable {
            self.entries.remove(key);
        }
        removable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbr_types::Family;
    use pretty_assertions::assert_eq;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, last])
    }

    fn nbr_ref(ip: &str) -> NbrRef {
        NbrRef {
            family: Family::Inet4,
            vrf_id: 0,
            ifindex: 5,
            ip: ip.parse().unwrap(),
        }
    }

    #[test]
    fn test_get_or_create_starts_incomplete() {
        let mut store = MacStore::default();
        let key = MacKey::new(10, mac(0x55));
        let entry = store.get_or_create(key);
        assert_eq!(entry.fdb_type, FdbType::Incomplete);
        assert_eq!(entry.mbr_if_index, 0);
        assert!(!entry.is_valid());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_gc_protects_learned() {
        let mut store = MacStore::default();
        let key = MacKey::new(10, mac(0x55));
        store.get_or_create(key).fdb_type = FdbType::Learned;
        assert!(!store.gc(&key));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_gc_protects_referenced() {
        let mut store = MacStore::default();
        let key = MacKey::new(10, mac(0x55));
        store.get_or_create(key).nbrs.insert(nbr_ref("10.0.0.1"));
        assert!(!store.gc(&key));

        store.get_mut(&key).unwrap().nbrs.clear();
        assert!(store.gc(&key));
        assert!(store.is_empty());
    }
}
