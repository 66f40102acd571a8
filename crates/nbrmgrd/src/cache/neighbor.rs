//! Neighbor cache and the per-VRF-per-interface reverse index.

use super::mac::MacKey;
use crate::stats::NbrCounters;
use crate::types::{NbrEntry, NbrFlags, NudState};
use nbr_types::Family;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// Key of a neighbor inside one VRF partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NbrKey {
    pub ifindex: u32,
    pub ip: IpAddr,
}

/// Full name of a neighbor, sufficient to find it in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NbrRef {
    pub family: Family,
    pub vrf_id: u32,
    pub ifindex: u32,
    pub ip: IpAddr,
}

/// A cached neighbor and its bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Neighbor {
    pub vrf_id: u32,
    pub vrf_name: String,
    pub family: Family,
    pub ip: IpAddr,
    pub ifindex: u32,
    /// Lower-layer L2 interface for bridged router interfaces (0 = none).
    pub parent_if: u32,
    pub status: NudState,
    pub flags: NbrFlags,
    /// MAC binding, if any; resolved through the MAC store.
    pub mac_key: Option<MacKey>,
    /// Whether the last successful NPU op was a create/update.
    pub published: bool,
    pub last_published_status: NudState,
    /// Refresh attempts made while the MAC binding was missing.
    pub retry_cnt: u32,
    /// Consecutive FAILED notifications while refreshing.
    pub failed_cnt: u32,
    /// Flushes that arrived while a refresh was already in flight; each
    /// one owes another refresh once the current one settles.
    pub refresh_cnt: u32,
    /// Refreshes spent waiting for the NPU to learn the MAC.
    pub mac_learn_retry_cnt: u32,
    pub prev_mac_learn_retry_cnt: u32,
    pub counters: NbrCounters,
}

impl Neighbor {
    pub fn from_entry(entry: &NbrEntry) -> Self {
        Self {
            vrf_id: entry.vrf_id,
            vrf_name: entry.vrf_name.clone(),
            family: entry.family,
            ip: entry.ip,
            ifindex: entry.ifindex,
            parent_if: 0,
            status: NudState::None,
            flags: NbrFlags::empty(),
            mac_key: None,
            published: false,
            last_published_status: NudState::None,
            retry_cnt: 0,
            failed_cnt: 0,
            refresh_cnt: 0,
            mac_learn_retry_cnt: 0,
            prev_mac_learn_retry_cnt: 0,
            counters: NbrCounters::default(),
        }
    }

    pub fn key(&self) -> NbrKey {
        NbrKey {
            ifindex: self.ifindex,
            ip: self.ip,
        }
    }

    pub fn nbr_ref(&self) -> NbrRef {
        NbrRef {
            family: self.family,
            vrf_id: self.vrf_id,
            ifindex: self.ifindex,
            ip: self.ip,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.status != NudState::Permanent
    }
}

/// The neighbor store: per family, partitioned by VRF.
#[derive(Debug, Default)]
pub struct NeighborStore {
    v4: HashMap<u32, HashMap<NbrKey, Neighbor>>,
    v6: HashMap<u32, HashMap<NbrKey, Neighbor>>,
}

impl NeighborStore {
    fn family_db(&self, family: Family) -> &HashMap<u32, HashMap<NbrKey, Neighbor>> {
        match family {
            Family::Inet6 => &self.v6,
            _ => &self.v4,
        }
    }

    fn family_db_mut(&mut self, family: Family) -> &mut HashMap<u32, HashMap<NbrKey, Neighbor>> {
        match family {
            Family::Inet6 => &mut self.v6,
            _ => &mut self.v4,
        }
    }

    pub fn get(&self, r: &NbrRef) -> Option<&Neighbor> {
        self.family_db(r.family).get(&r.vrf_id)?.get(&NbrKey {
            ifindex: r.ifindex,
            ip: r.ip,
        })
    }

    pub fn contains(&self, r: &NbrRef) -> bool {
        self.get(r).is_some()
    }

    /// Removes the neighbor for exclusive mutation; pair with [`put`].
    ///
    /// [`put`]: NeighborStore::put
    pub fn take(&mut self, r: &NbrRef) -> Option<Neighbor> {
        let db = self.family_db_mut(r.family);
        let vrf = db.get_mut(&r.vrf_id)?;
        let nbr = vrf.remove(&NbrKey {
            ifindex: r.ifindex,
            ip: r.ip,
        });
        if vrf.is_empty() {
            db.remove(&r.vrf_id);
        }
        nbr
    }

    /// Returns a taken neighbor to the store.
    pub fn put(&mut self, nbr: Neighbor) {
        let key = nbr.key();
        self.family_db_mut(nbr.family)
            .entry(nbr.vrf_id)
            .or_default()
            .insert(key, nbr);
    }

    /// VRF ids present in either family partition.
    pub fn vrf_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.v4.keys().chain(self.v6.keys()).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn iter_vrf(&self, family: Family, vrf_id: u32) -> impl Iterator<Item = &Neighbor> {
        self.family_db(family)
            .get(&vrf_id)
            .into_iter()
            .flat_map(|m| m.values())
    }

    pub fn len(&self) -> usize {
        self.v4.values().map(HashMap::len).sum::<usize>()
            + self.v6.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reverse index `(vrf, ifindex) -> neighbors`, kept in lockstep with the
/// neighbor store for O(1)-per-match interface and flush walks.
#[derive(Debug, Default)]
pub struct IfNbrIndex {
    map: HashMap<(u32, u32), HashSet<NbrRef>>,
}

impl IfNbrIndex {
    pub fn add(&mut self, r: NbrRef) {
        self.map.entry((r.vrf_id, r.ifindex)).or_default().insert(r);
    }

    pub fn remove(&mut self, r: &NbrRef) {
        if let Some(set) = self.map.get_mut(&(r.vrf_id, r.ifindex)) {
            set.remove(r);
            if set.is_empty() {
                self.map.remove(&(r.vrf_id, r.ifindex));
            }
        }
    }

    /// Snapshot of the neighbors on one (vrf, ifindex).
    pub fn refs(&self, vrf_id: u32, ifindex: u32) -> Vec<NbrRef> {
        self.map
            .get(&(vrf_id, ifindex))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Interfaces of one VRF that still carry neighbors.
    pub fn ifindexes(&self, vrf_id: u32) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .map
            .keys()
            .filter(|(v, _)| *v == vrf_id)
            .map(|(_, i)| *i)
            .collect();
        out.sort_unstable();
        out
    }

    /// Snapshot of every indexed neighbor.
    pub fn all_refs(&self) -> Vec<NbrRef> {
        self.map.values().flatten().copied().collect()
    }

    pub fn is_empty_for(&self, vrf_id: u32, ifindex: u32) -> bool {
        !self.map.contains_key(&(vrf_id, ifindex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(ip: &str, ifindex: u32) -> NbrEntry {
        let ip: IpAddr = ip.parse().unwrap();
        NbrEntry {
            ip,
            ifindex,
            family: Family::from_ip(&ip),
            ..Default::default()
        }
    }

    #[test]
    fn test_take_put_round_trip() {
        let mut store = NeighborStore::default();
        let nbr = Neighbor::from_entry(&entry("10.0.0.1", 5));
        let r = nbr.nbr_ref();
        store.put(nbr);
        assert_eq!(store.len(), 1);

        let mut taken = store.take(&r).unwrap();
        assert!(store.is_empty());
        taken.status = NudState::Reachable;
        store.put(taken);
        assert_eq!(store.get(&r).unwrap().status, NudState::Reachable);
    }

    #[test]
    fn test_families_partitioned() {
        let mut store = NeighborStore::default();
        store.put(Neighbor::from_entry(&entry("10.0.0.1", 5)));
        store.put(Neighbor::from_entry(&entry("2001:db8::1", 5)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.iter_vrf(Family::Inet4, 0).count(), 1);
        assert_eq!(store.iter_vrf(Family::Inet6, 0).count(), 1);
    }

    #[test]
    fn test_reverse_index() {
        let mut index = IfNbrIndex::default();
        let a = Neighbor::from_entry(&entry("10.0.0.1", 5)).nbr_ref();
        let b = Neighbor::from_entry(&entry("10.0.0.2", 5)).nbr_ref();
        index.add(a);
        index.add(b);
        assert_eq!(index.refs(0, 5).len(), 2);
        assert_eq!(index.ifindexes(0), vec![5]);

        index.remove(&a);
        index.remove(&b);
        assert!(index.is_empty_for(0, 5));
        assert!(index.all_refs().is_empty());
    }

    #[test]
    fn test_vrf_ids_deduped() {
        let mut store = NeighborStore::default();
        let mut n1 = Neighbor::from_entry(&entry("10.0.0.1", 5));
        n1.vrf_id = 3;
        let mut n2 = Neighbor::from_entry(&entry("2001:db8::1", 5));
        n2.vrf_id = 3;
        store.put(n1);
        store.put(n2);
        assert_eq!(store.vrf_ids(), vec![3]);
    }
}
