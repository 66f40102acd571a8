//! Kernel command channel.
//!
//! Resolve/refresh directives end up here; the real implementation writes
//! netlink neighbor requests and is out of scope.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - AC-3: Access Enforcement - Kernel netlink requires CAP_NET_ADMIN
//! - SC-7: Boundary Protection - Kernel interface commands

use crate::types::NbrEntry;
use thiserror::Error;
use tracing::debug;

/// Kernel command errors.
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    #[error("kernel resolve failed: {0}")]
    ResolveFailed(String),
    #[error("kernel refresh failed: {0}")]
    RefreshFailed(String),
}

/// Result type for kernel commands.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Channel through which the kernel is asked to probe neighbors.
pub trait KernelChannel: Send + Sync {
    /// Broadcast ARP request / neighbor solicitation to learn a binding.
    fn resolve_neighbor(&self, entry: &NbrEntry) -> KernelResult<()>;

    /// Unicast probe keeping an existing binding alive.
    fn refresh_neighbor(&self, entry: &NbrEntry) -> KernelResult<()>;
}

/// Logging stub used by the daemon binary when no channel is wired up.
#[derive(Debug, Default)]
pub struct NoopKernel;

impl KernelChannel for NoopKernel {
    fn resolve_neighbor(&self, entry: &NbrEntry) -> KernelResult<()> {
        debug!(ip = %entry.ip, ifindex = entry.ifindex, "kernel: resolve neighbor");
        Ok(())
    }

    fn refresh_neighbor(&self, entry: &NbrEntry) -> KernelResult<()> {
        debug!(ip = %entry.ip, mac = %entry.mac, ifindex = entry.ifindex, "kernel: refresh neighbor");
        Ok(())
    }
}
