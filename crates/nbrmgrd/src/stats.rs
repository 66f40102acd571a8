//! Counters kept by the processor, resolvers and ingress adapter.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Processor-wide counters, owned by the neighbor processor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcStats {
    pub nbr_add_msg_cnt: u64,
    pub nbr_del_msg_cnt: u64,
    pub nbr_rslv_add_msg_cnt: u64,
    pub nbr_rslv_del_msg_cnt: u64,
    pub nbr_add_incomplete_msg_cnt: u64,
    pub nbr_add_reachable_msg_cnt: u64,
    pub nbr_add_stale_msg_cnt: u64,
    pub nbr_add_delay_msg_cnt: u64,
    pub nbr_add_probe_msg_cnt: u64,
    pub nbr_add_failed_msg_cnt: u64,
    pub nbr_add_permanent_msg_cnt: u64,
    pub fdb_add_msg_cnt: u64,
    pub fdb_del_msg_cnt: u64,
    pub intf_add_msg_cnt: u64,
    pub intf_del_msg_cnt: u64,
    pub flush_msg_cnt: u64,
    /// Neighbors whose refresh was deferred because one was in flight.
    pub flush_nbr_cnt: u64,
    /// Neighbors a flush pushed into refresh/resolve.
    pub flush_trig_refresh_cnt: u64,
    pub dump_msg_cnt: u64,
    pub npu_prg_msg_cnt: u64,
    pub npu_prg_fail_cnt: u64,
}

/// Per-neighbor counters, reported in dumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NbrCounters {
    pub resolve_cnt: u64,
    pub refresh_cnt: u64,
    pub delay_refresh_cnt: u64,
    pub hw_mac_learn_refresh_cnt: u64,
    pub mac_not_present_cnt: u64,
    pub retry_cnt: u64,
    pub failed_trig_resolve_cnt: u64,
    pub stale_trig_refresh_cnt: u64,
    pub mac_trig_refresh: u64,
    pub flush_refresh: u64,
    pub flush_skip_refresh: u64,
    pub flush_failed_resolve: u64,
    pub npu_prg_msg_cnt: u64,
}

/// Shared ingress counters; bumped from event-source threads.
#[derive(Debug, Default)]
pub struct IngressStats {
    pub enqueued: AtomicU64,
    pub dropped_intf: AtomicU64,
    pub dropped_nbr: AtomicU64,
    pub dropped_fdb: AtomicU64,
    pub dropped_resolve_req: AtomicU64,
    pub dropped_flush: AtomicU64,
    pub dropped_dump: AtomicU64,
    pub rejected_malformed: AtomicU64,
}

impl IngressStats {
    pub fn total_dropped(&self) -> u64 {
        self.dropped_intf.load(Ordering::Relaxed)
            + self.dropped_nbr.load(Ordering::Relaxed)
            + self.dropped_fdb.load(Ordering::Relaxed)
            + self.dropped_resolve_req.load(Ordering::Relaxed)
            + self.dropped_flush.load(Ordering::Relaxed)
            + self.dropped_dump.load(Ordering::Relaxed)
    }
}

/// Counters of one resolver task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub resolve_cnt: u64,
    pub refresh_cnt: u64,
    pub failed_cnt: u64,
    pub burst_cnt: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingress_total_dropped() {
        let stats = IngressStats::default();
        assert_eq!(stats.total_dropped(), 0);
        stats.dropped_nbr.fetch_add(3, Ordering::Relaxed);
        stats.dropped_flush.fetch_add(1, Ordering::Relaxed);
        assert_eq!(stats.total_dropped(), 4);
    }

    #[test]
    fn test_proc_stats_default() {
        let stats = ProcStats::default();
        assert_eq!(stats.nbr_add_msg_cnt, 0);
        assert_eq!(stats.flush_trig_refresh_cnt, 0);
    }
}
