//! Event ingress adapter.
//!
//! External event sources (netlink reader, control-plane RPC) hand fully
//! decoded entries to this adapter, which tags and enqueues them. A full
//! queue drops the message and bumps a counter; the processor never sees
//! partial or undecoded payloads.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-10: Information Input Validation - Malformed payloads rejected here
//! - SC-5: Denial of Service Protection - Bounded queues, counted drops
//! - AU-12: Audit Record Generation - Dropped and rejected events logged

use crate::config::NbrMgrConfig;
use crate::msg::{MsgType, NbrMsg};
use crate::stats::IngressStats;
use crate::types::{DumpRequest, FlushRequest, IntfEntry, NbrEntry, NudState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

pub struct EventIngress {
    tx: mpsc::Sender<NbrMsg>,
    cfg: NbrMgrConfig,
    stats: Arc<IngressStats>,
}

impl EventIngress {
    pub fn new(tx: mpsc::Sender<NbrMsg>, cfg: NbrMgrConfig) -> Self {
        Self {
            tx,
            cfg,
            stats: Arc::new(IngressStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngressStats> {
        Arc::clone(&self.stats)
    }

    /// Kernel neighbor event. Fills in the configured refresh-on-stale
    /// policy for the entry's VRF and family.
    pub fn neighbor_event(&self, msg_type: MsgType, mut entry: NbrEntry) -> bool {
        if !entry.family.is_ip() {
            debug!(family = %entry.family, "neighbor event with non-IP family rejected");
            self.stats.rejected_malformed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        entry.auto_refresh_on_stale = self
            .cfg
            .auto_refresh_on_stale(&entry.vrf_name, entry.family);
        self.enqueue(NbrMsg::Nbr(msg_type, entry), &self.stats.dropped_nbr)
    }

    /// L2 FDB event.
    pub fn fdb_event(&self, msg_type: MsgType, entry: NbrEntry) -> bool {
        if msg_type.is_add() && entry.mac.is_zero() && entry.status == NudState::Reachable {
            debug!(ifindex = entry.ifindex, "FDB add with zero MAC rejected");
            self.stats.rejected_malformed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.enqueue(NbrMsg::Fdb(msg_type, entry), &self.stats.dropped_fdb)
    }

    /// Interface add/update/delete.
    pub fn intf_event(&self, entry: IntfEntry) -> bool {
        self.enqueue(NbrMsg::Intf(entry), &self.stats.dropped_intf)
    }

    /// Proactive resolve (Add) or stop-resolve (Del) from the control
    /// plane.
    pub fn resolve_request(&self, msg_type: MsgType, entry: NbrEntry) -> bool {
        self.enqueue(
            NbrMsg::ResolveReq(msg_type, entry),
            &self.stats.dropped_resolve_req,
        )
    }

    pub fn flush_request(&self, flush: FlushRequest) -> bool {
        self.enqueue(NbrMsg::Flush(flush), &self.stats.dropped_flush)
    }

    pub fn dump_request(&self, req: DumpRequest) -> bool {
        self.enqueue(NbrMsg::Dump(req), &self.stats.dropped_dump)
    }

    fn enqueue(&self, msg: NbrMsg, drop_counter: &AtomicU64) -> bool {
        let kind = msg.kind();
        match self.tx.try_send(msg) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                error!(kind, error = %e, "main queue unavailable, event dropped");
                drop_counter.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbr_types::{Family, MacAddress};

    fn ingress(depth: usize) -> (EventIngress, mpsc::Receiver<NbrMsg>) {
        let (tx, rx) = mpsc::channel(depth);
        (EventIngress::new(tx, NbrMgrConfig::default()), rx)
    }

    #[test]
    fn test_neighbor_event_gets_auto_refresh_policy() {
        let (ingress, mut rx) = ingress(4);
        let entry = NbrEntry {
            ip: "10.0.0.1".parse().unwrap(),
            vrf_name: "default".to_string(),
            ..Default::default()
        };
        assert!(ingress.neighbor_event(MsgType::Add, entry));
        match rx.try_recv().unwrap() {
            NbrMsg::Nbr(MsgType::Add, e) => assert!(e.auto_refresh_on_stale),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_bridge_family_rejected() {
        let (ingress, mut rx) = ingress(4);
        let entry = NbrEntry {
            family: Family::Bridge,
            ..Default::default()
        };
        assert!(!ingress.neighbor_event(MsgType::Add, entry));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            ingress.stats().rejected_malformed.load(Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn test_fdb_zero_mac_rejected() {
        let (ingress, _rx) = ingress(4);
        let entry = NbrEntry {
            family: Family::Bridge,
            mac: MacAddress::ZERO,
            status: NudState::Reachable,
            ..Default::default()
        };
        assert!(!ingress.fdb_event(MsgType::Add, entry));
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (ingress, _rx) = ingress(1);
        assert!(ingress.flush_request(FlushRequest::default()));
        assert!(!ingress.flush_request(FlushRequest::default()));
        let stats = ingress.stats();
        assert_eq!(stats.dropped_flush.load(Ordering::Relaxed), 1);
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 1);
    }
}
