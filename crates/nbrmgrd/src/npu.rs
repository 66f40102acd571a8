//! Forwarding-plane programming backend.
//!
//! The processor talks to the NPU through this trait only; the real
//! backend lives in a separate component and is out of scope here.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-8: System Component Inventory - Hardware neighbor table kept in sync
//! - SC-7: Boundary Protection - Forwarding-plane state mirrors kernel state
//! - AU-12: Audit Record Generation - All programming attempts logged

use crate::types::{IntfEntry, NbrEntry};
use nbr_types::MacAddress;
use thiserror::Error;
use tracing::debug;

/// Operation dispatched to the NPU neighbor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpuOp {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for NpuOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NpuOp::Create => "Create",
            NpuOp::Update => "Update",
            NpuOp::Delete => "Delete",
        };
        f.write_str(s)
    }
}

/// NPU programming errors with NIST-compliant error messages.
#[derive(Debug, Clone, Error)]
pub enum NpuError {
    #[error("NPU program failed: {0}")]
    ProgramFailed(String),
    #[error("NPU query failed: {0}")]
    QueryFailed(String),
}

/// Result type for NPU operations.
pub type NpuResult<T> = std::result::Result<T, NpuError>;

/// Backend adapter absorbing neighbor and interface programming.
///
/// Calls are synchronous and expected to be short; a blocking backend
/// stalls the whole processor pipeline.
///
/// # NIST Controls
/// - CM-8: System Component Inventory - Authoritative hardware view
/// - SI-4: System Monitoring - Hardware MAC presence queries
pub trait NpuBackend: Send + Sync {
    /// Create/update/delete a neighbor entry in hardware. A zero MAC
    /// creates a blackhole entry that lifts packets for resolution.
    fn program_neighbor(&self, op: NpuOp, entry: &NbrEntry) -> NpuResult<()>;

    /// Mirror an interface status change to the forwarding plane.
    fn notify_intf_status(&self, op: NpuOp, intf: &IntfEntry) -> NpuResult<()>;

    /// Whether the MAC is actually installed in the hardware FDB.
    fn is_mac_present_in_hw(&self, mac: MacAddress, ifindex: u32) -> NpuResult<bool>;

    /// Ask the control plane to replay all next hops of a family, used at
    /// startup to recover proactive-resolve requests.
    fn get_all_neighbors(&self, family: nbr_types::Family) -> NpuResult<()>;
}

/// Logging stub used by the daemon binary when no backend is wired up.
#[derive(Debug, Default)]
pub struct NoopNpu;

impl NpuBackend for NoopNpu {
    fn program_neighbor(&self, op: NpuOp, entry: &NbrEntry) -> NpuResult<()> {
        debug!(%op, ip = %entry.ip, mac = %entry.mac, ifindex = entry.ifindex, "npu: program neighbor");
        Ok(())
    }

    fn notify_intf_status(&self, op: NpuOp, intf: &IntfEntry) -> NpuResult<()> {
        debug!(%op, vrf = intf.vrf_id, ifindex = intf.ifindex, "npu: interface status");
        Ok(())
    }

    fn is_mac_present_in_hw(&self, _mac: MacAddress, _ifindex: u32) -> NpuResult<bool> {
        Ok(true)
    }

    fn get_all_neighbors(&self, family: nbr_types::Family) -> NpuResult<()> {
        debug!(%family, "npu: get all neighbors");
        Ok(())
    }
}
