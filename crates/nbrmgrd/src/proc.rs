//! The neighbor processor: single consumer of the main queue, sole owner
//! of the neighbor/MAC/interface caches.
//!
//! All cache mutation happens on this task, so no locking is needed.
//! Neighbors are taken out of the store, mutated, and put back; while an
//! entry is out, the rest of the processor state stays borrowable.

use crate::cache::{
    FdbType, IfNbrIndex, Interface, InterfaceStore, MacKey, MacStore, NbrRef, Neighbor,
    NeighborStore,
};
use crate::config::{NbrMgrConfig, DEFAULT_VRF_ID};
use crate::dump;
use crate::msg::{MsgType, NbrMsg};
use crate::npu::{NpuBackend, NpuOp};
use crate::resolve::{Directive, DirectiveKind};
use crate::stats::ProcStats;
use crate::types::{DumpRequest, FlushRequest, IntfEntry, IntfFlags, NbrEntry, NbrFlags, NudState};
use nbr_types::Family;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct NbrProcessor<N> {
    cfg: NbrMgrConfig,
    npu: Arc<N>,
    nbrs: NeighborStore,
    macs: MacStore,
    intfs: InterfaceStore,
    if_nbrs: IfNbrIndex,
    burst_tx: mpsc::Sender<Directive>,
    delay_tx: mpsc::Sender<Directive>,
    stats: ProcStats,
}

impl<N: NpuBackend> NbrProcessor<N> {
    pub fn new(
        cfg: NbrMgrConfig,
        npu: Arc<N>,
        burst_tx: mpsc::Sender<Directive>,
        delay_tx: mpsc::Sender<Directive>,
    ) -> Self {
        Self {
            cfg,
            npu,
            nbrs: NeighborStore::default(),
            macs: MacStore::default(),
            intfs: InterfaceStore::default(),
            if_nbrs: IfNbrIndex::default(),
            burst_tx,
            delay_tx,
            stats: ProcStats::default(),
        }
    }

    /// Consumes the main queue until every producer is gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<NbrMsg>) -> Self {
        while let Some(msg) = rx.recv().await {
            self.handle_msg(msg);
        }
        info!("main queue closed, neighbor processor exiting");
        self
    }

    /// Processes one message. Exposed so tests can drive the processor
    /// without a runtime.
    pub fn handle_msg(&mut self, msg: NbrMsg) {
        match msg {
            NbrMsg::Intf(intf) => self.handle_intf_msg(intf),
            NbrMsg::Nbr(msg_type, entry) | NbrMsg::ResolveReq(msg_type, entry) => {
                self.handle_nbr_msg(msg_type, entry)
            }
            NbrMsg::Fdb(msg_type, entry) => self.handle_fdb_msg(msg_type, entry),
            NbrMsg::Flush(flush) => self.handle_flush_msg(flush),
            NbrMsg::Dump(req) => self.handle_dump_msg(req),
        }
    }

    pub fn stats(&self) -> &ProcStats {
        &self.stats
    }

    pub fn neighbor(&self, r: &NbrRef) -> Option<&Neighbor> {
        self.nbrs.get(r)
    }

    pub fn neighbors(&self) -> &NeighborStore {
        &self.nbrs
    }

    pub fn macs(&self) -> &MacStore {
        &self.macs
    }

    pub fn interfaces(&self) -> &InterfaceStore {
        &self.intfs
    }

    pub fn if_index(&self) -> &IfNbrIndex {
        &self.if_nbrs
    }

    // ------------------------------------------------------------------
    // Neighbor events
    // ------------------------------------------------------------------

    fn handle_nbr_msg(&mut self, msg_type: MsgType, entry: NbrEntry) {
        if entry.status != NudState::Delay && entry.status != NudState::Probe {
            info!(
                msg_type = ?msg_type, vrf = entry.vrf_id, vrf_name = %entry.vrf_name,
                family = %entry.family, ip = %entry.ip, mac = %entry.mac,
                ifindex = entry.ifindex, mbr_if = entry.mbr_if_index,
                flags = ?entry.flags, status = %entry.status,
                "neighbor event"
            );
        }
        match msg_type {
            MsgType::Add => self.handle_nbr_add(entry),
            MsgType::Del => self.handle_nbr_del(entry),
        }
    }

    fn count_nbr_add(&mut self, entry: &NbrEntry) {
        if entry.flags.contains(NbrFlags::RESOLVE) {
            self.stats.nbr_rslv_add_msg_cnt += 1;
        } else {
            self.stats.nbr_add_msg_cnt += 1;
        }
        match entry.status {
            NudState::Incomplete => self.stats.nbr_add_incomplete_msg_cnt += 1,
            NudState::Reachable => self.stats.nbr_add_reachable_msg_cnt += 1,
            NudState::Stale => self.stats.nbr_add_stale_msg_cnt += 1,
            NudState::Delay => self.stats.nbr_add_delay_msg_cnt += 1,
            NudState::Probe => self.stats.nbr_add_probe_msg_cnt += 1,
            NudState::Failed => self.stats.nbr_add_failed_msg_cnt += 1,
            NudState::Permanent => self.stats.nbr_add_permanent_msg_cnt += 1,
            _ => {}
        }
    }

    fn handle_nbr_add(&mut self, mut entry: NbrEntry) {
        self.count_nbr_add(&entry);

        let r = NbrRef {
            family: entry.family,
            vrf_id: entry.vrf_id,
            ifindex: entry.ifindex,
            ip: entry.ip,
        };

        // DELAY/PROBE/FAILED carry no binding; without prior state they
        // are meaningless.
        let mut nbr = if entry.status.is_transient() {
            match self.nbrs.take(&r) {
                Some(nbr) => nbr,
                None => {
                    debug!(ip = %entry.ip, status = %entry.status, "transient state for unknown neighbor, dropped");
                    return;
                }
            }
        } else {
            if entry.status == NudState::Incomplete
                && !self.intfs.is_admin_up(entry.vrf_id, entry.ifindex)
            {
                debug!(ip = %entry.ip, ifindex = entry.ifindex, "INCOMPLETE on down/unknown interface, dropped");
                return;
            }
            match self.nbrs.take(&r) {
                Some(nbr) => nbr,
                None => self.create_neighbor(&entry),
            }
        };

        // Proactive resolution requested by the control plane. The entry
        // is pinned until a stop-resolve arrives.
        if entry.flags.contains(NbrFlags::RESOLVE) {
            nbr.flags.insert(NbrFlags::RESOLVE);
            if nbr.status == NudState::None || nbr.status == NudState::Failed {
                self.trigger_resolve(&mut nbr);
            }
            self.nbrs.put(nbr);
            return;
        }

        // Learn the lower-layer interface once and pair it with the router
        // interface so FDB/flush events on either side find the other.
        if nbr.parent_if == 0 && entry.parent_if != 0 && nbr.ifindex != entry.parent_if {
            nbr.parent_if = entry.parent_if;
            self.pair_interfaces(
                (nbr.vrf_id, nbr.ifindex),
                (DEFAULT_VRF_ID, entry.parent_if),
            );
        }

        if self.mac_changed(&nbr, &entry) {
            warn!(
                vrf = nbr.vrf_id, ip = %nbr.ip, new_mac = %entry.mac,
                published = nbr.published, "neighbor MAC changed"
            );
            if nbr.published {
                let del = self.populate_entry(&nbr);
                self.publish(&mut nbr, NpuOp::Delete, &del);
            }
            self.detach_mac(&mut nbr);
            entry.flags.insert(NbrFlags::MAC_CHANGE);
        }

        if nbr.mac_key.is_none() && !entry.mac.is_zero() {
            self.attach_mac(&mut nbr, entry.parent_if, &entry);
        }

        self.process_nbr_state(&mut nbr, entry);
        self.nbrs.put(nbr);
    }

    /// The state transition table applied to `(nbr.status, entry.status)`.
    fn process_nbr_state(&mut self, nbr: &mut Neighbor, mut entry: NbrEntry) {
        let mac_info = nbr
            .mac_key
            .and_then(|k| self.macs.get(&k).map(|m| (m.is_valid(), m.mbr_if_index)));

        if entry.status == NudState::Incomplete {
            // Blackhole entry lifts packets for resolution. INCOMPLETE
            // notifications during an ongoing refresh are ignored.
            if !nbr.flags.contains(NbrFlags::REFRESH) {
                self.publish(nbr, NpuOp::Create, &entry);
            }
        } else if self.is_programmable_transition(nbr, &entry) {
            nbr.failed_cnt = 0;
            match mac_info {
                Some((true, mbr_if)) => {
                    let mut hw_check = false;
                    if nbr.flags.contains(NbrFlags::REFRESH) {
                        if nbr.refresh_cnt > 0 {
                            // Flushes arrived while this refresh was in
                            // flight; they owe another round.
                            info!(ip = %nbr.ip, refresh_cnt = nbr.refresh_cnt, "refresh again after queued flushes");
                            nbr.refresh_cnt = 0;
                            self.trigger_refresh(nbr);
                        } else {
                            nbr.prev_mac_learn_retry_cnt = nbr.mac_learn_retry_cnt;
                            nbr.mac_learn_retry_cnt = 0;
                            nbr.flags
                                .remove(NbrFlags::REFRESH_FOR_MAC_LEARN | NbrFlags::REFRESH);
                            // Listeners still want the state change.
                            self.publish(nbr, NpuOp::Create, &entry);
                            hw_check = true;
                        }
                    } else if nbr.flags.contains(NbrFlags::REFRESH_FOR_MAC_LEARN) {
                        nbr.flags.remove(NbrFlags::REFRESH_FOR_MAC_LEARN);
                        if nbr.mac_learn_retry_cnt == self.cfg.max_mac_learn_retry {
                            error!(
                                ip = %nbr.ip, retries = nbr.mac_learn_retry_cnt,
                                "MAC not learnt in hardware after refresh retries"
                            );
                            self.publish(nbr, NpuOp::Create, &entry);
                        } else {
                            nbr.mac_learn_retry_cnt += 1;
                            hw_check = true;
                        }
                    } else {
                        entry.mbr_if_index = mbr_if;
                        self.publish(nbr, NpuOp::Create, &entry);
                        hw_check = true;
                    }
                    if hw_check {
                        self.verify_hw_mac(nbr, &entry);
                    }
                    nbr.retry_cnt = 0;
                }
                _ if entry.status == NudState::Permanent => {
                    nbr.flags.insert(NbrFlags::MAC_NOT_PRESENT);
                }
                _ => {
                    // Binding known to the kernel but the FDB has not
                    // confirmed it (MAC learning may be off on the link).
                    nbr.counters.retry_cnt += 1;
                    if nbr.retry_cnt == self.cfg.max_nbr_retry {
                        info!(ip = %nbr.ip, "MAC still unconfirmed, waiting for an FDB event");
                    } else {
                        if !nbr.flags.contains(NbrFlags::REFRESH) {
                            nbr.flags.insert(NbrFlags::MAC_NOT_PRESENT);
                        }
                        nbr.retry_cnt += 1;
                        self.trigger_delay_refresh(nbr);
                    }
                }
            }
            if nbr.mac_key.is_some() && nbr.flags.contains(NbrFlags::MAC_NOT_PRESENT) {
                // The NPU accepts host entries ahead of MAC resolution;
                // program now and keep refreshing until the MAC learns.
                entry.mbr_if_index = mac_info.map(|(_, mbr)| mbr).unwrap_or(0);
                self.publish(nbr, NpuOp::Create, &entry);
            }
        } else if entry.status == NudState::Failed {
            nbr.retry_cnt = 0;
            nbr.flags.remove(NbrFlags::REFRESH_FOR_MAC_LEARN);
            nbr.prev_mac_learn_retry_cnt = nbr.mac_learn_retry_cnt;
            nbr.mac_learn_retry_cnt = 0;
            if nbr.flags.contains(NbrFlags::REFRESH) {
                nbr.counters.failed_trig_resolve_cnt += 1;
                if nbr.failed_cnt == self.cfg.max_nbr_retry {
                    info!(ip = %nbr.ip, "not resolved after retries");
                    if nbr.refresh_cnt > 0 {
                        nbr.refresh_cnt = 0;
                        self.trigger_resolve(nbr);
                    } else {
                        nbr.flags.remove(NbrFlags::REFRESH);
                        if nbr.flags.contains(NbrFlags::RESOLVE) {
                            self.trigger_resolve(nbr);
                        }
                        self.publish(nbr, NpuOp::Create, &entry);
                    }
                } else {
                    nbr.refresh_cnt = 0;
                    nbr.failed_cnt += 1;
                    self.trigger_resolve(nbr);
                }
            } else if nbr.flags.contains(NbrFlags::RESOLVE) {
                self.trigger_resolve(nbr);
                self.publish(nbr, NpuOp::Create, &entry);
            } else {
                self.publish(nbr, NpuOp::Create, &entry);
            }
        }

        if entry.status == NudState::Stale && entry.auto_refresh_on_stale {
            // Unidirectional traffic never re-confirms a neighbor; probe it
            // before the kernel lets the entry decay.
            if nbr.status != NudState::Incomplete {
                nbr.flags.insert(NbrFlags::REFRESH);
            }
            nbr.counters.stale_trig_refresh_cnt += 1;
            self.trigger_refresh(nbr);
            self.publish(nbr, NpuOp::Create, &entry);
        }

        nbr.status = entry.status;
    }

    /// Transitions that program a forwarding entry. Besides plain
    /// REACHABLE/PERMANENT the kernel may jump INCOMPLETE->DELAY or
    /// INCOMPLETE->STALE directly, report STALE for a gratuitous ARP, or
    /// settle FAILED->STALE under wide ECMP fan-outs.
    fn is_programmable_transition(&self, nbr: &Neighbor, entry: &NbrEntry) -> bool {
        matches!(entry.status, NudState::Reachable | NudState::Permanent)
            || (entry.status == NudState::Delay && nbr.status == NudState::Incomplete)
            || (entry.status == NudState::Stale && nbr.status == NudState::Incomplete)
            || (entry.status == NudState::Stale && nbr.status == NudState::Failed)
            || (entry.status == NudState::Stale
                && (!nbr.published || entry.flags.contains(NbrFlags::MAC_CHANGE)))
    }

    fn verify_hw_mac(&mut self, nbr: &mut Neighbor, entry: &NbrEntry) {
        match self.npu.is_mac_present_in_hw(entry.mac, entry.parent_if) {
            Ok(true) => {
                nbr.flags.remove(NbrFlags::REFRESH_FOR_MAC_LEARN);
                nbr.prev_mac_learn_retry_cnt = nbr.mac_learn_retry_cnt;
                nbr.mac_learn_retry_cnt = 0;
            }
            Ok(false) => {
                debug!(ip = %nbr.ip, mac = %entry.mac, "MAC not in hardware, refreshing for MAC learn");
                nbr.counters.mac_not_present_cnt += 1;
                self.trigger_refresh_for_mac_learn(nbr);
            }
            Err(e) => debug!(ip = %nbr.ip, error = %e, "hardware MAC query failed"),
        }
    }

    fn handle_nbr_del(&mut self, entry: NbrEntry) {
        if entry.flags.contains(NbrFlags::RESOLVE) {
            self.stats.nbr_rslv_del_msg_cnt += 1;
        } else {
            self.stats.nbr_del_msg_cnt += 1;
        }

        let r = NbrRef {
            family: entry.family,
            vrf_id: entry.vrf_id,
            ifindex: entry.ifindex,
            ip: entry.ip,
        };
        let Some(mut nbr) = self.nbrs.take(&r) else {
            debug!(ip = %entry.ip, "delete for unknown neighbor");
            return;
        };

        if entry.flags.contains(NbrFlags::RESOLVE) {
            // Stop-resolve from the control plane.
            if !nbr.flags.contains(NbrFlags::RESOLVE) {
                warn!(ip = %nbr.ip, "stop-resolve for a neighbor never pinned");
                self.nbrs.put(nbr);
                return;
            }
            nbr.flags.remove(NbrFlags::RESOLVE | NbrFlags::REFRESH);
            if nbr.status == NudState::None {
                self.drop_neighbor(nbr);
            } else {
                // Others may still rely on the kernel entry.
                self.nbrs.put(nbr);
            }
            return;
        }

        if nbr.flags.contains(NbrFlags::RESOLVE) {
            // Kernel evicted a pinned neighbor: resolve it again and pull
            // the forwarding entry meanwhile.
            nbr.status = NudState::None;
            self.trigger_resolve(&mut nbr);
            self.publish(&mut nbr, NpuOp::Delete, &entry);
            self.nbrs.put(nbr);
            return;
        }

        self.publish(&mut nbr, NpuOp::Delete, &entry);
        self.drop_neighbor(nbr);
    }

    /// Builds a new cache entry, registers it in the reverse index, and
    /// attaches the MAC if the event carries one.
    fn create_neighbor(&mut self, entry: &NbrEntry) -> Neighbor {
        let mut nbr = Neighbor::from_entry(entry);
        debug!(vrf = nbr.vrf_id, ip = %nbr.ip, ifindex = nbr.ifindex, "neighbor created");
        self.if_nbrs.add(nbr.nbr_ref());
        if !entry.mac.is_zero() {
            self.attach_mac(&mut nbr, entry.parent_if, entry);
        }
        nbr
    }

    /// Removes a neighbor for good: MAC back-reference, reverse index.
    fn drop_neighbor(&mut self, mut nbr: Neighbor) {
        self.detach_mac(&mut nbr);
        self.if_nbrs.remove(&nbr.nbr_ref());
        debug!(vrf = nbr.vrf_id, ip = %nbr.ip, "neighbor removed");
    }

    fn attach_mac(&mut self, nbr: &mut Neighbor, parent_if: u32, entry: &NbrEntry) {
        let key = MacKey::new(parent_if, entry.mac);
        let mac = self.macs.get_or_create(key);
        mac.nbrs.insert(nbr.nbr_ref());
        nbr.mac_key = Some(key);
        debug!(ip = %nbr.ip, mac = %entry.mac, parent_if, "MAC attached");
    }

    fn detach_mac(&mut self, nbr: &mut Neighbor) {
        if let Some(key) = nbr.mac_key.take() {
            let r = nbr.nbr_ref();
            if let Some(mac) = self.macs.get_mut(&key) {
                mac.nbrs.remove(&r);
            }
            self.macs.gc(&key);
        }
    }

    fn mac_changed(&self, nbr: &Neighbor, entry: &NbrEntry) -> bool {
        match nbr.mac_key {
            Some(key) => {
                !entry.mac.is_zero() && !key.mac.is_zero() && key.mac != entry.mac
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // FDB events
    // ------------------------------------------------------------------

    fn handle_fdb_msg(&mut self, msg_type: MsgType, entry: NbrEntry) {
        info!(
            msg_type = ?msg_type, mac = %entry.mac, ifindex = entry.ifindex,
            mbr_if = entry.mbr_if_index, status = %entry.status, "FDB event"
        );
        let key = MacKey::new(entry.ifindex, entry.mac);

        match msg_type {
            MsgType::Add => {
                self.stats.fdb_add_msg_cnt += 1;
                let mac = self.macs.get_or_create(key);
                if mac.is_valid() && mac.mbr_if_index == entry.mbr_if_index {
                    debug!(mac = %entry.mac, "FDB entry already learnt");
                    return;
                }
                if entry.mbr_if_index != 0 {
                    mac.mbr_if_index = entry.mbr_if_index;
                    mac.fdb_type = FdbType::Learned;
                } else {
                    mac.fdb_type = FdbType::Ignore;
                }
            }
            MsgType::Del => {
                self.stats.fdb_del_msg_cnt += 1;
                let Some(mac) = self.macs.get_mut(&key) else {
                    debug!(mac = %entry.mac, ifindex = entry.ifindex, "FDB delete for unknown MAC");
                    return;
                };
                if mac.nbr_list_empty() {
                    self.macs.remove(&key);
                    return;
                }
                mac.mbr_if_index = 0;
                mac.fdb_type = FdbType::Incomplete;
            }
        }

        let refs: Vec<NbrRef> = self
            .macs
            .get(&key)
            .map(|m| m.nbrs.iter().copied().collect())
            .unwrap_or_default();
        for r in refs {
            if let Some(mut nbr) = self.nbrs.take(&r) {
                self.handle_fdb_change(&mut nbr, msg_type, entry.status);
                self.nbrs.put(nbr);
            }
        }
    }

    /// Reaction of one referencing neighbor to an FDB mutation.
    fn handle_fdb_change(&mut self, nbr: &mut Neighbor, evt: MsgType, status: NudState) {
        debug!(ip = %nbr.ip, ifindex = nbr.ifindex, evt = ?evt, "FDB change for neighbor");

        if evt == MsgType::Del || status == NudState::Stale {
            // A topology change moved or aged out the MAC; re-learn the
            // correct port with a unicast probe. Static entries and
            // neighbors without a binding are left alone.
            if nbr.status != NudState::Permanent
                && nbr.status != NudState::Failed
                && nbr.status != NudState::Incomplete
            {
                nbr.flags.insert(NbrFlags::REFRESH);
                nbr.counters.mac_trig_refresh += 1;
                self.trigger_refresh(nbr);
            }
            return;
        }
        if evt == MsgType::Add && nbr.status == NudState::Failed {
            nbr.flags.insert(NbrFlags::REFRESH);
            self.trigger_resolve(nbr);
        }

        if nbr.flags.contains(NbrFlags::MAC_NOT_PRESENT) {
            // The MAC finally learnt; program the full forwarding entry.
            nbr.flags.remove(NbrFlags::MAC_NOT_PRESENT);
            nbr.retry_cnt = 0;
            if !nbr.status.is_resolved() {
                debug!(ip = %nbr.ip, status = %nbr.status, "FDB change ignored for unresolved neighbor");
                return;
            }
            let entry = self.populate_entry(nbr);
            self.publish(nbr, NpuOp::Update, &entry);
        } else {
            if nbr.status != NudState::Permanent && nbr.retry_cnt > 0 {
                nbr.retry_cnt = 0;
                nbr.flags.remove(NbrFlags::REFRESH);
            }
            // The NPU learns the MAC itself; nothing to program here.
        }
    }

    // ------------------------------------------------------------------
    // Interface events
    // ------------------------------------------------------------------

    fn handle_intf_msg(&mut self, intf: IntfEntry) {
        info!(
            vrf = intf.vrf_id, ifindex = intf.ifindex, is_del = intf.is_op_del,
            admin_up = intf.is_admin_up, vlan = intf.vlan_id, "interface event"
        );

        if !intf.is_op_del {
            self.stats.intf_add_msg_cnt += 1;
            let mut incoming = intf;
            if let Some(existing) = self.intfs.get(intf.vrf_id, intf.ifindex).copied() {
                if incoming.flags == IntfFlags::VLAN {
                    // VLAN-only update; admin state untouched, no notify.
                    if let Some(cached) = self.intfs.get_mut(intf.vrf_id, intf.ifindex) {
                        cached.vlan_id = incoming.vlan_id;
                    }
                    return;
                }
                if incoming.flags == IntfFlags::ADMIN && existing.vlan_id != 0 {
                    incoming.vlan_id = existing.vlan_id;
                }
                if existing.is_admin_up == incoming.is_admin_up
                    && existing.vlan_id == incoming.vlan_id
                {
                    return;
                }
                let (pvrf, pif) = existing.paired.unwrap_or((0, 0));
                incoming.parent_or_child_vrf = pvrf;
                incoming.parent_or_child_ifindex = pif;
            }
            if let Err(e) = self.npu.notify_intf_status(NpuOp::Create, &incoming) {
                warn!(ifindex = incoming.ifindex, error = %e, "interface notify failed");
            }
            self.intfs.insert(Interface::from_entry(&incoming));
        } else {
            self.stats.intf_del_msg_cnt += 1;
            if let Err(e) = self.npu.notify_intf_status(NpuOp::Delete, &intf) {
                warn!(ifindex = intf.ifindex, error = %e, "interface notify failed");
            }
            if let Some(existing) = self.intfs.remove(intf.vrf_id, intf.ifindex) {
                if let Some((pvrf, pif)) = existing.paired {
                    if let Some(counterpart) = self.intfs.get_mut(pvrf, pif) {
                        counterpart.paired = None;
                    }
                }
            }
        }

        for r in self.if_nbrs.refs(intf.vrf_id, intf.ifindex) {
            let Some(mut nbr) = self.nbrs.take(&r) else {
                continue;
            };
            self.handle_if_state_change(&mut nbr, &intf);
            if intf.is_op_del || !intf.is_admin_up {
                if nbr.flags.contains(NbrFlags::RESOLVE) {
                    // Pinned by the control plane; keep it for the next
                    // resolution round but pull the forwarding entry.
                    let del = self.populate_entry(&nbr);
                    self.publish(&mut nbr, NpuOp::Delete, &del);
                    self.nbrs.put(nbr);
                } else {
                    let del = self.populate_entry(&nbr);
                    self.publish(&mut nbr, NpuOp::Delete, &del);
                    self.drop_neighbor(nbr);
                }
            } else {
                self.nbrs.put(nbr);
            }
        }
    }

    fn handle_if_state_change(&mut self, nbr: &mut Neighbor, intf: &IntfEntry) {
        debug!(
            ip = %nbr.ip, ifindex = intf.ifindex, admin_up = intf.is_admin_up,
            flags = ?nbr.flags, status = %nbr.status, "interface state change"
        );
        if intf.is_admin_up {
            if nbr.flags.contains(NbrFlags::RESOLVE)
                && nbr.status != NudState::Reachable
                && nbr.status != NudState::Permanent
            {
                self.trigger_resolve(nbr);
            }
        } else {
            nbr.status = NudState::None;
        }
    }

    /// Writes both halves of an L3<->L2 pairing, or neither, so the link
    /// stays symmetric. Stale counterparts of either side are unlinked.
    fn pair_interfaces(&mut self, l3: (u32, u32), l2: (u32, u32)) {
        let Some(l2_intf) = self.intfs.get(l2.0, l2.1).copied() else {
            return;
        };
        if l2_intf.paired == Some(l3) {
            return;
        }
        if self.intfs.get(l3.0, l3.1).is_none() {
            return;
        }
        info!(l3_vrf = l3.0, l3_if = l3.1, l2_if = l2.1, "pairing interfaces");
        for side in [l2, l3] {
            let old = self.intfs.get(side.0, side.1).and_then(|i| i.paired);
            if let Some(old) = old {
                if old != l2 && old != l3 {
                    if let Some(stale) = self.intfs.get_mut(old.0, old.1) {
                        stale.paired = None;
                    }
                }
            }
        }
        if let Some(i) = self.intfs.get_mut(l2.0, l2.1) {
            i.paired = Some(l3);
        }
        if let Some(i) = self.intfs.get_mut(l3.0, l3.1) {
            i.paired = Some(l2);
        }
    }

    // ------------------------------------------------------------------
    // Flush events
    // ------------------------------------------------------------------

    fn handle_flush_msg(&mut self, flush: FlushRequest) {
        info!(vrf = flush.vrf_id, ifindex = flush.ifindex, "flush request");

        if flush.vrf_id != 0 && flush.ifindex == 0 {
            // VRF teardown: every interface in the VRF goes away.
            for ifindex in self.if_nbrs.ifindexes(flush.vrf_id) {
                let mut intf = match self.intfs.get(flush.vrf_id, ifindex) {
                    Some(cached) => cached.to_entry(),
                    None => IntfEntry {
                        vrf_id: flush.vrf_id,
                        ifindex,
                        ..Default::default()
                    },
                };
                intf.is_op_del = true;
                intf.is_admin_up = false;
                self.handle_intf_msg(intf);
            }
            return;
        }

        self.stats.flush_msg_cnt += 1;
        if flush.ifindex != 0 {
            // A flush on an L2 interface must reflect onto the L3 router
            // interface its neighbors actually live on.
            let (vrf_id, ifindex) = self
                .intfs
                .get(flush.vrf_id, flush.ifindex)
                .and_then(|i| i.paired)
                .unwrap_or((flush.vrf_id, flush.ifindex));
            info!(vrf = vrf_id, ifindex, "flushing interface neighbors");
            for r in self.if_nbrs.refs(vrf_id, ifindex) {
                self.flush_neighbor(&r);
            }
        } else {
            for r in self.if_nbrs.all_refs() {
                self.flush_neighbor(&r);
            }
        }
    }

    fn flush_neighbor(&mut self, r: &NbrRef) {
        let Some(mut nbr) = self.nbrs.take(r) else {
            return;
        };
        if nbr.is_dynamic() {
            if nbr.flags.contains(NbrFlags::REFRESH) || nbr.status == NudState::Incomplete {
                // A refresh is already in flight; owe another one.
                self.stats.flush_nbr_cnt += 1;
                nbr.refresh_cnt += 1;
                nbr.counters.flush_skip_refresh += 1;
            } else if nbr.status == NudState::Failed {
                self.stats.flush_trig_refresh_cnt += 1;
                nbr.counters.flush_failed_resolve += 1;
                self.trigger_resolve(&mut nbr);
            } else {
                self.stats.flush_trig_refresh_cnt += 1;
                nbr.counters.flush_refresh += 1;
                self.trigger_refresh(&mut nbr);
            }
        }
        self.nbrs.put(nbr);
    }

    // ------------------------------------------------------------------
    // Directives and publishing
    // ------------------------------------------------------------------

    /// Payload for directives and publishes, built from cached state. The
    /// member port is only filled in once the FDB confirmed the MAC.
    fn populate_entry(&self, nbr: &Neighbor) -> NbrEntry {
        let mut entry = NbrEntry {
            vrf_id: nbr.vrf_id,
            vrf_name: nbr.vrf_name.clone(),
            family: nbr.family,
            ip: nbr.ip,
            ifindex: nbr.ifindex,
            parent_if: nbr.parent_if,
            status: nbr.status,
            ..Default::default()
        };
        if let Some(key) = nbr.mac_key {
            entry.mac = key.mac;
            if let Some(mac) = self.macs.get(&key) {
                if mac.is_valid() {
                    entry.mbr_if_index = mac.mbr_if_index;
                }
            }
        }
        entry
    }

    fn trigger_resolve(&mut self, nbr: &mut Neighbor) -> bool {
        let entry = self.populate_entry(nbr);
        if !self.intfs.is_admin_up(nbr.vrf_id, nbr.ifindex) {
            return false;
        }
        nbr.counters.resolve_cnt += 1;
        self.send_directive(DirectiveKind::Resolve, entry)
    }

    fn trigger_refresh(&mut self, nbr: &mut Neighbor) -> bool {
        if nbr.status == NudState::Permanent {
            return false;
        }
        if nbr.mac_key.is_none() {
            info!(ip = %nbr.ip, "no MAC binding, refresh skipped");
            return false;
        }
        let entry = self.populate_entry(nbr);
        if !self.intfs.is_admin_up(nbr.vrf_id, nbr.ifindex) {
            return false;
        }
        if !nbr.flags.contains(NbrFlags::MAC_NOT_PRESENT) {
            nbr.flags.insert(NbrFlags::REFRESH);
        }
        nbr.counters.refresh_cnt += 1;
        self.send_directive(DirectiveKind::Refresh, entry)
    }

    fn trigger_delay_refresh(&mut self, nbr: &mut Neighbor) -> bool {
        if nbr.status == NudState::Permanent {
            return false;
        }
        if nbr.mac_key.is_none() {
            info!(ip = %nbr.ip, "no MAC binding, refresh skipped");
            return false;
        }
        let entry = self.populate_entry(nbr);
        if !self.intfs.is_admin_up(nbr.vrf_id, nbr.ifindex) {
            return false;
        }
        if !nbr.flags.contains(NbrFlags::MAC_NOT_PRESENT) {
            nbr.flags.insert(NbrFlags::REFRESH);
        }
        nbr.counters.delay_refresh_cnt += 1;
        self.send_directive(DirectiveKind::DelayRefresh, entry)
    }

    fn trigger_refresh_for_mac_learn(&mut self, nbr: &mut Neighbor) -> bool {
        if nbr.status == NudState::Permanent {
            return false;
        }
        if nbr.mac_key.is_none() {
            info!(ip = %nbr.ip, "no MAC binding, refresh skipped");
            return false;
        }
        let entry = self.populate_entry(nbr);
        if !self.intfs.is_admin_up(nbr.vrf_id, nbr.ifindex) {
            return false;
        }
        nbr.flags.insert(NbrFlags::REFRESH_FOR_MAC_LEARN);
        nbr.counters.hw_mac_learn_refresh_cnt += 1;
        self.send_directive(DirectiveKind::DelayRefresh, entry)
    }

    fn send_directive(&mut self, kind: DirectiveKind, entry: NbrEntry) -> bool {
        let tx = match kind {
            DirectiveKind::DelayRefresh => &self.delay_tx,
            _ => &self.burst_tx,
        };
        match tx.try_send(Directive { kind, entry }) {
            Ok(()) => true,
            Err(e) => {
                error!(kind = ?kind, error = %e, "directive queue unavailable, dropped");
                false
            }
        }
    }

    /// Programs the NPU and keeps the publish bookkeeping straight:
    /// a repeat CREATE becomes an UPDATE, a DELETE for a never-published
    /// entry is elided, and a successful DELETE clears `published`.
    fn publish(&mut self, nbr: &mut Neighbor, op: NpuOp, entry: &NbrEntry) -> bool {
        let op = if nbr.published && op == NpuOp::Create {
            NpuOp::Update
        } else {
            op
        };
        if op == NpuOp::Delete && !nbr.published {
            return true;
        }
        self.stats.npu_prg_msg_cnt += 1;
        nbr.counters.npu_prg_msg_cnt += 1;
        nbr.last_published_status = entry.status;
        match self.npu.program_neighbor(op, entry) {
            Ok(()) => {
                nbr.published = op != NpuOp::Delete;
                info!(
                    op = %op, vrf = entry.vrf_id, ip = %entry.ip, mac = %entry.mac,
                    ifindex = entry.ifindex, mbr_if = entry.mbr_if_index,
                    status = %entry.status, "published to NPU"
                );
                true
            }
            Err(e) => {
                // Next matching event retries.
                self.stats.npu_prg_fail_cnt += 1;
                warn!(op = %op, ip = %entry.ip, error = %e, "NPU program failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Dump
    // ------------------------------------------------------------------

    fn handle_dump_msg(&mut self, req: DumpRequest) {
        self.stats.dump_msg_cnt += 1;
        for line in self.render_dump(&req).lines() {
            info!("{line}");
        }
    }

    /// Human-readable snapshot of the three caches plus counters.
    pub fn render_dump(&self, req: &DumpRequest) -> String {
        dump::render(&self.nbrs, &self.macs, &self.intfs, &self.stats, req)
    }

    /// Machine-readable snapshot for the CLI surface.
    pub fn dump_json(&self, req: &DumpRequest) -> serde_json::Value {
        dump::to_json(&self.nbrs, &self.macs, &self.intfs, &self.stats, req)
    }

    /// Startup hook: ask the control plane to replay the next hops it
    /// wants resolved proactively.
    pub fn request_all_neighbors(&self) {
        for family in [Family::Inet4, Family::Inet6] {
            if let Err(e) = self.npu.get_all_neighbors(family) {
                warn!(%family, error = %e, "next-hop replay request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npu::NpuResult;
    use nbr_types::MacAddress;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockNpu {
        ops: Mutex<Vec<NpuOp>>,
    }

    impl NpuBackend for MockNpu {
        fn program_neighbor(&self, op: NpuOp, _entry: &NbrEntry) -> NpuResult<()> {
            self.ops.lock().unwrap().push(op);
            Ok(())
        }

        fn notify_intf_status(&self, _op: NpuOp, _intf: &IntfEntry) -> NpuResult<()> {
            Ok(())
        }

        fn is_mac_present_in_hw(&self, _mac: MacAddress, _ifindex: u32) -> NpuResult<bool> {
            Ok(true)
        }

        fn get_all_neighbors(&self, _family: Family) -> NpuResult<()> {
            Ok(())
        }
    }

    fn processor() -> (NbrProcessor<MockNpu>, Arc<MockNpu>) {
        let npu = Arc::new(MockNpu::default());
        let (burst_tx, _) = mpsc::channel(64);
        let (delay_tx, _) = mpsc::channel(64);
        (
            NbrProcessor::new(NbrMgrConfig::default(), Arc::clone(&npu), burst_tx, delay_tx),
            npu,
        )
    }

    fn nbr(ip: &str) -> Neighbor {
        Neighbor::from_entry(&NbrEntry {
            ip: ip.parse().unwrap(),
            ifindex: 5,
            ..Default::default()
        })
    }

    #[test]
    fn test_publish_upgrades_repeat_create_to_update() {
        let (mut proc, npu) = processor();
        let mut n = nbr("10.0.0.1");
        let entry = proc.populate_entry(&n);

        assert!(proc.publish(&mut n, NpuOp::Create, &entry));
        assert!(n.published);
        assert!(proc.publish(&mut n, NpuOp::Create, &entry));
        assert_eq!(*npu.ops.lock().unwrap(), vec![NpuOp::Create, NpuOp::Update]);
    }

    #[test]
    fn test_publish_delete_clears_published() {
        let (mut proc, npu) = processor();
        let mut n = nbr("10.0.0.1");
        let entry = proc.populate_entry(&n);

        proc.publish(&mut n, NpuOp::Create, &entry);
        proc.publish(&mut n, NpuOp::Delete, &entry);
        assert!(!n.published);
        // A later publish starts over with a CREATE.
        proc.publish(&mut n, NpuOp::Create, &entry);
        assert_eq!(
            *npu.ops.lock().unwrap(),
            vec![NpuOp::Create, NpuOp::Delete, NpuOp::Create]
        );
    }

    #[test]
    fn test_publish_delete_unpublished_is_elided() {
        let (mut proc, npu) = processor();
        let mut n = nbr("10.0.0.1");
        let entry = proc.populate_entry(&n);

        assert!(proc.publish(&mut n, NpuOp::Delete, &entry));
        assert!(npu.ops.lock().unwrap().is_empty());
    }

    #[test]
    fn test_pair_interfaces_requires_both_sides() {
        let (mut proc, _npu) = processor();
        proc.intfs.insert(Interface {
            vrf_id: 0,
            ifindex: 17,
            is_admin_up: true,
            is_bridge: true,
            vlan_id: 0,
            paired: None,
        });
        // L3 side missing: neither half is written.
        proc.pair_interfaces((1, 5), (0, 17));
        assert_eq!(proc.intfs.get(0, 17).unwrap().paired, None);

        proc.intfs.insert(Interface {
            vrf_id: 1,
            ifindex: 5,
            is_admin_up: true,
            is_bridge: false,
            vlan_id: 0,
            paired: None,
        });
        proc.pair_interfaces((1, 5), (0, 17));
        assert_eq!(proc.intfs.get(0, 17).unwrap().paired, Some((1, 5)));
        assert_eq!(proc.intfs.get(1, 5).unwrap().paired, Some((0, 17)));
    }

    #[test]
    fn test_pair_interfaces_unlinks_stale_counterpart() {
        let (mut proc, _npu) = processor();
        for (vrf_id, ifindex) in [(0, 17), (1, 5), (2, 6)] {
            proc.intfs.insert(Interface {
                vrf_id,
                ifindex,
                is_admin_up: true,
                is_bridge: ifindex == 17,
                vlan_id: 0,
                paired: None,
            });
        }
        proc.pair_interfaces((1, 5), (0, 17));
        // The bridge moves under a different router interface.
        proc.pair_interfaces((2, 6), (0, 17));
        assert_eq!(proc.intfs.get(0, 17).unwrap().paired, Some((2, 6)));
        assert_eq!(proc.intfs.get(2, 6).unwrap().paired, Some((0, 17)));
        assert_eq!(proc.intfs.get(1, 5).unwrap().paired, None);
    }
}
