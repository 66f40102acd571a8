//! Snapshot rendering of the three caches.

use crate::cache::{InterfaceStore, MacStore, NeighborStore};
use crate::stats::ProcStats;
use crate::types::DumpRequest;
use nbr_types::Family;
use serde_json::json;
use std::fmt::Write;

/// Human-readable snapshot, one entity per line.
pub fn render(
    nbrs: &NeighborStore,
    macs: &MacStore,
    intfs: &InterfaceStore,
    stats: &ProcStats,
    req: &DumpRequest,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== neighbors ({}) ===", nbrs.len());
    for vrf_id in nbrs.vrf_ids() {
        if req.vrf_id.is_some_and(|v| v != vrf_id) {
            continue;
        }
        for family in [Family::Inet4, Family::Inet6] {
            for nbr in nbrs.iter_vrf(family, vrf_id) {
                let mac = nbr
                    .mac_key
                    .map(|k| k.mac.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "vrf {} ({}) {} {} if {} parent {} mac {} status {} flags {:?} \
                     published {} retry {} failed {} refresh_queued {} mac_learn_retry {}",
                    nbr.vrf_id,
                    nbr.vrf_name,
                    nbr.family,
                    nbr.ip,
                    nbr.ifindex,
                    nbr.parent_if,
                    mac,
                    nbr.status,
                    nbr.flags,
                    nbr.published,
                    nbr.retry_cnt,
                    nbr.failed_cnt,
                    nbr.refresh_cnt,
                    nbr.mac_learn_retry_cnt,
                );
            }
        }
    }

    let _ = writeln!(out, "=== macs ({}) ===", macs.len());
    for mac in macs.iter() {
        let _ = writeln!(
            out,
            "if {} mac {} mbr_if {} type {:?} nbr_refs {}",
            mac.key.ifindex,
            mac.key.mac,
            mac.mbr_if_index,
            mac.fdb_type,
            mac.nbrs.len(),
        );
    }

    let _ = writeln!(out, "=== interfaces ({}) ===", intfs.len());
    for intf in intfs.iter() {
        if req.vrf_id.is_some_and(|v| v != intf.vrf_id) {
            continue;
        }
        let paired = intf
            .paired
            .map(|(v, i)| format!("{v}/{i}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "vrf {} if {} admin_up {} bridge {} vlan {} paired {}",
            intf.vrf_id, intf.ifindex, intf.is_admin_up, intf.is_bridge, intf.vlan_id, paired,
        );
    }

    let _ = writeln!(out, "=== stats ===");
    let _ = writeln!(
        out,
        "nbr add {} del {} rslv_add {} rslv_del {} fdb add {} del {} \
         intf add {} del {} flush {} flush_trig_refresh {} npu {} npu_fail {}",
        stats.nbr_add_msg_cnt,
        stats.nbr_del_msg_cnt,
        stats.nbr_rslv_add_msg_cnt,
        stats.nbr_rslv_del_msg_cnt,
        stats.fdb_add_msg_cnt,
        stats.fdb_del_msg_cnt,
        stats.intf_add_msg_cnt,
        stats.intf_del_msg_cnt,
        stats.flush_msg_cnt,
        stats.flush_trig_refresh_cnt,
        stats.npu_prg_msg_cnt,
        stats.npu_prg_fail_cnt,
    );
    out
}

/// Snapshot as JSON, consumed by the CLI dump surface.
pub fn to_json(
    nbrs: &NeighborStore,
    macs: &MacStore,
    intfs: &InterfaceStore,
    stats: &ProcStats,
    req: &DumpRequest,
) -> serde_json::Value {
    let mut nbr_list = Vec::new();
    for vrf_id in nbrs.vrf_ids() {
        if req.vrf_id.is_some_and(|v| v != vrf_id) {
            continue;
        }
        for family in [Family::Inet4, Family::Inet6] {
            nbr_list.extend(nbrs.iter_vrf(family, vrf_id).map(|n| json!(n)));
        }
    }
    let mac_list: Vec<_> = macs.iter().map(|m| json!(m)).collect();
    let intf_list: Vec<_> = intfs
        .iter()
        .filter(|i| !req.vrf_id.is_some_and(|v| v != i.vrf_id))
        .map(|i| json!(i))
        .collect();
    json!({
        "neighbors": nbr_list,
        "macs": mac_list,
        "interfaces": intf_list,
        "stats": stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Interface, Neighbor};
    use crate::types::NbrEntry;

    #[test]
    fn test_render_empty() {
        let out = render(
            &NeighborStore::default(),
            &MacStore::default(),
            &InterfaceStore::default(),
            &ProcStats::default(),
            &DumpRequest::default(),
        );
        assert!(out.contains("=== neighbors (0) ==="));
        assert!(out.contains("=== stats ==="));
    }

    #[test]
    fn test_render_vrf_filter() {
        let mut nbrs = NeighborStore::default();
        let mut a = Neighbor::from_entry(&NbrEntry {
            ip: "10.0.0.1".parse().unwrap(),
            ifindex: 5,
            ..Default::default()
        });
        a.vrf_id = 1;
        nbrs.put(a);

        let mut intfs = InterfaceStore::default();
        intfs.insert(Interface {
            vrf_id: 2,
            ifindex: 9,
            is_admin_up: true,
            is_bridge: false,
            vlan_id: 0,
            paired: None,
        });

        let out = render(
            &nbrs,
            &MacStore::default(),
            &intfs,
            &ProcStats::default(),
            &DumpRequest { vrf_id: Some(1) },
        );
        assert!(out.contains("10.0.0.1"));
        assert!(!out.contains("vrf 2 if 9"));
    }

    #[test]
    fn test_json_shape() {
        let value = to_json(
            &NeighborStore::default(),
            &MacStore::default(),
            &InterfaceStore::default(),
            &ProcStats::default(),
            &DumpRequest::default(),
        );
        assert!(value["neighbors"].as_array().unwrap().is_empty());
        assert!(value["stats"]["nbr_add_msg_cnt"].is_u64());
    }
}
