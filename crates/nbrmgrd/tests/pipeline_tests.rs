//! Full pipeline: ingress -> processor -> paced resolvers -> kernel.

use nbr_types::{Family, MacAddress};
use nbrmgrd::config::NbrMgrConfig;
use nbrmgrd::ingress::EventIngress;
use nbrmgrd::kernel::{KernelChannel, KernelResult};
use nbrmgrd::msg::MsgType;
use nbrmgrd::npu::{NpuBackend, NpuOp, NpuResult};
use nbrmgrd::proc::NbrProcessor;
use nbrmgrd::resolve::Resolver;
use nbrmgrd::types::{IntfEntry, IntfFlags, NbrEntry, NudState};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct CountingNpu {
    programs: AtomicU64,
}

impl NpuBackend for CountingNpu {
    fn program_neighbor(&self, _op: NpuOp, _entry: &NbrEntry) -> NpuResult<()> {
        self.programs.fetch_add(1, Ordering::Relaxed);
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

#[derive(Default)]
struct CountingKernel {
    resolves: AtomicU64,
    refreshes: AtomicU64,
}

impl KernelChannel for CountingKernel {
    fn resolve_neighbor(&self, _entry: &NbrEntry) -> KernelResult<()> {
        self.resolves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn refresh_neighbor(&self, _entry: &NbrEntry) -> KernelResult<()> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn events_flow_from_ingress_to_kernel() {
    let cfg = NbrMgrConfig::default();
    let npu = Arc::new(CountingNpu::default());
    let kernel = Arc::new(CountingKernel::default());

    let (main_tx, main_rx) = mpsc::channel(cfg.main_queue_depth);
    let (burst_tx, burst_rx) = mpsc::channel(cfg.directive_queue_depth);
    let (delay_tx, delay_rx) = mpsc::channel(cfg.directive_queue_depth);

    let ingress = EventIngress::new(main_tx, cfg.clone());
    let processor = NbrProcessor::new(cfg.clone(), Arc::clone(&npu), burst_tx, delay_tx);
    let burst = Resolver::new(
        "burst",
        burst_rx,
        Arc::clone(&kernel),
        cfg.burst_count,
        cfg.burst_interval,
    );
    let delayed = Resolver::new(
        "delayed",
        delay_rx,
        Arc::clone(&kernel),
        cfg.burst_count,
        cfg.delay_interval,
    );

    let proc_task = tokio::spawn(processor.run(main_rx));
    let burst_task = tokio::spawn(burst.run());
    let delay_task = tokio::spawn(delayed.run());

    let intf = IntfEntry {
        ifindex: 5,
        flags: IntfFlags::ADMIN,
        is_admin_up: true,
        ..Default::default()
    };
    assert!(ingress.intf_event(intf));

    let ip: IpAddr = "10.0.0.1".parse().unwrap();
    let entry = NbrEntry {
        vrf_name: "default".to_string(),
        family: Family::from_ip(&ip),
        ip,
        mac: MacAddress::new([0xaa, 0, 0, 0, 0, 1]),
        ifindex: 5,
        status: NudState::Reachable,
        ..Default::default()
    };
    assert!(ingress.neighbor_event(MsgType::Add, entry));

    // Close the pipeline; the processor drains, then the resolvers.
    drop(ingress);
    let processor = proc_task.await.unwrap();
    let burst_stats = burst_task.await.unwrap();
    let delay_stats = delay_task.await.unwrap();

    // The unconfirmed MAC sends one delayed refresh to the kernel.
    assert_eq!(processor.stats().nbr_add_msg_cnt, 1);
    assert!(npu.programs.load(Ordering::Relaxed) >= 1);
    assert_eq!(kernel.refreshes.load(Ordering::Relaxed), 1);
    assert_eq!(delay_stats.refresh_cnt, 1);
    assert_eq!(burst_stats.resolve_cnt + burst_stats.refresh_cnt, 0);
}
