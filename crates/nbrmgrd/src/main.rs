//! Neighbor manager daemon entry point.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - AU-3: Content of Audit Records - Structured logging
//! - AU-12: Audit Record Generation - Log daemon lifecycle
//! - CM-6: Configuration Settings - CLI-driven pacing and retry bounds
//! - SI-4: System Monitoring - Real-time event processing

use clap::Parser;
use nbrmgrd::config::NbrMgrConfig;
use nbrmgrd::error::NbrMgrError;
use nbrmgrd::ingress::EventIngress;
use nbrmgrd::kernel::NoopKernel;
use nbrmgrd::npu::NoopNpu;
use nbrmgrd::proc::NbrProcessor;
use nbrmgrd::resolve::Resolver;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Neighbor manager: keeps kernel ARP/ND state and the NPU neighbor table
/// consistent.
#[derive(Debug, Parser)]
#[command(name = "nbrmgrd", version, about)]
struct Args {
    /// Bound of the main event queue.
    #[arg(long, default_value_t = 10_000)]
    main_queue_depth: usize,

    /// Bound of each directive queue.
    #[arg(long, default_value_t = 10_000)]
    directive_queue_depth: usize,

    /// Directives forwarded to the kernel per pacing window.
    #[arg(long, default_value_t = 300)]
    burst_count: usize,

    /// Pacing window of the burst resolver, in seconds.
    #[arg(long, default_value_t = 1)]
    burst_interval_secs: u64,

    /// Pacing window of the delayed resolver, in seconds.
    #[arg(long, default_value_t = 5)]
    delay_interval_secs: u64,

    /// Disable automatic refresh of stale IPv4 neighbors.
    #[arg(long)]
    no_auto_refresh_v4: bool,

    /// Disable automatic refresh of stale IPv6 neighbors.
    #[arg(long)]
    no_auto_refresh_v6: bool,
}

impl Args {
    fn into_config(self) -> NbrMgrConfig {
        NbrMgrConfig {
            main_queue_depth: self.main_queue_depth,
            directive_queue_depth: self.directive_queue_depth,
            burst_count: self.burst_count,
            burst_interval: Duration::from_secs(self.burst_interval_secs),
            delay_interval: Duration::from_secs(self.delay_interval_secs),
            auto_refresh_v4: !self.no_auto_refresh_v4,
            auto_refresh_v6: !self.no_auto_refresh_v6,
            ..Default::default()
        }
    }
}

/// Initialize structured logging
///
/// # NIST Controls
/// - AU-3: Content of Audit Records - Structured format
/// - AU-9: Protection of Audit Information - Log to system journal
fn init_logging() -> nbrmgrd::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NbrMgrError::Config(format!("failed to set logger: {e}")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let cfg = Args::parse().into_config();
    info!(?cfg, "nbrmgrd: starting neighbor manager");

    let npu = Arc::new(NoopNpu);
    let kernel = Arc::new(NoopKernel);

    let (main_tx, main_rx) = mpsc::channel(cfg.main_queue_depth);
    let (burst_tx, burst_rx) = mpsc::channel(cfg.directive_queue_depth);
    let (delay_tx, delay_rx) = mpsc::channel(cfg.directive_queue_depth);

    let ingress = EventIngress::new(main_tx, cfg.clone());
    let ingress_stats = ingress.stats();

    let processor = NbrProcessor::new(cfg.clone(), Arc::clone(&npu), burst_tx, delay_tx);
    processor.request_all_neighbors();

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

    info!("nbrmgrd: event pipeline running");
    signal::ctrl_c().await?;
    info!("nbrmgrd: received shutdown signal, draining queues");

    // Dropping the ingress closes the main queue; the processor drains and
    // exits, its directive senders drop, and both resolvers follow.
    drop(ingress);

    match proc_task.await {
        Ok(processor) => {
            let dump = processor.render_dump(&Default::default());
            for line in dump.lines() {
                info!("{line}");
            }
        }
        Err(e) => error!(error = %e, "nbrmgrd: processor task failed"),
    }
    let burst_stats = burst_task.await?;
    let delay_stats = delay_task.await?;
    info!(
        ?burst_stats,
        ?delay_stats,
        dropped = ingress_stats.total_dropped(),
        "nbrmgrd: shutdown complete"
    );
    Ok(())
}
