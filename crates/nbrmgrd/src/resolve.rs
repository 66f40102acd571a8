//! Paced delivery of resolve/refresh directives to the kernel.
//!
//! Two resolver tasks share this implementation: the burst resolver
//! (1 s pacing) for ordinary resolves and refreshes, and the delayed
//! resolver (5 s pacing) for MAC-learn-pending refreshes.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SC-5: Denial of Service Protection - Burst caps keep kernel ARP queues sane
//! - SI-4: System Monitoring - Directive counters per resolver

use crate::kernel::KernelChannel;
use crate::stats::ResolverStats;
use crate::types::NbrEntry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the kernel is asked to do for one neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Broadcast ARP request / neighbor solicitation.
    Resolve,
    /// Unicast probe of a known binding.
    Refresh,
    /// Same payload as `Refresh`, steered to the slower-paced queue.
    DelayRefresh,
}

/// One unit of work for a resolver: the kind plus a fully populated entry.
#[derive(Debug, Clone)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub entry: NbrEntry,
}

/// Drains a directive queue at a capped rate: at most `burst_count`
/// directives per pacing interval, FIFO within a burst, no deduplication.
pub struct Resolver<K> {
    name: &'static str,
    rx: mpsc::Receiver<Directive>,
    kernel: Arc<K>,
    burst_count: usize,
    interval: Duration,
    stats: ResolverStats,
}

impl<K: KernelChannel> Resolver<K> {
    pub fn new(
        name: &'static str,
        rx: mpsc::Receiver<Directive>,
        kernel: Arc<K>,
        burst_count: usize,
        interval: Duration,
    ) -> Self {
        Self {
            name,
            rx,
            kernel,
            burst_count,
            interval,
            stats: ResolverStats::default(),
        }
    }

    /// Runs until the directive queue closes. Returns the final counters.
    pub async fn run(mut self) -> ResolverStats {
        while let Some(first) = self.rx.recv().await {
            let mut sent = 1usize;
            self.dispatch(first);
            while sent < self.burst_count {
                match self.rx.try_recv() {
                    Ok(directive) => {
                        self.dispatch(directive);
                        sent += 1;
                    }
                    Err(_) => break,
                }
            }
            self.stats.burst_cnt += 1;
            debug!(resolver = self.name, sent, "burst complete, pacing");
            tokio::time::sleep(self.interval).await;
        }
        info!(resolver = self.name, "directive queue closed, resolver exiting");
        self.stats
    }

    fn dispatch(&mut self, directive: Directive) {
        let entry = &directive.entry;
        let result = match directive.kind {
            DirectiveKind::Resolve => {
                self.stats.resolve_cnt += 1;
                self.kernel.resolve_neighbor(entry)
            }
            DirectiveKind::Refresh | DirectiveKind::DelayRefresh => {
                self.stats.refresh_cnt += 1;
                self.kernel.refresh_neighbor(entry)
            }
        };
        if let Err(e) = result {
            // Best effort: a later flush or kernel state change re-triggers.
            self.stats.failed_cnt += 1;
            warn!(resolver = self.name, ip = %entry.ip, error = %e, "kernel directive failed");
        }
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }
}
