//! Neighbor manager daemon.
//!
//! Sits between the kernel's IP-neighbor subsystem (ARP for IPv4, ND for
//! IPv6) and the forwarding-plane programming layer. Maintains the
//! authoritative view of every neighbor, resolves missing bindings
//! proactively, keeps hardware neighbor tables consistent with kernel
//! state, and refreshes dynamic entries before they expire so that
//! unidirectional traffic keeps working.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//!
//! This crate implements the following security controls:
//!
//! | Control | Description | Implementation |
//! |---------|-------------|----------------|
//! | AU-3 | Content of Audit Records | Structured logging with neighbor details |
//! | AU-12 | Audit Record Generation | All neighbor and NPU changes logged |
//! | CM-6 | Configuration Settings | Pacing/retry knobs configurable via CLI |
//! | CM-8 | System Component Inventory | Track network neighbors and interfaces |
//! | IA-3 | Device Identification | MAC address tracking per neighbor |
//! | SC-5 | DoS Protection | Burst pacing caps kernel ARP/NS load |
//! | SC-7 | Boundary Protection | Network boundary neighbor awareness |
//! | SI-4 | System Monitoring | Real-time neighbor state monitoring |
//! | SI-10 | Input Validation | Neighbor entries validated at ingress |
//! | SI-11 | Error Handling | Structured error types |
//!
//! # Architecture
//!
//! ```text
//! [netlink / RPC] --> EventIngress --> main queue --> NbrProcessor --> NpuBackend
//!                                                        |
//!                                     +------------------+------------------+
//!                                     v                                     v
//!                               burst queue --> Resolver(1s)          delay queue --> Resolver(5s)
//!                                     |                                     |
//!                                     +------------> KernelChannel <--------+
//! ```
//!
//! The processor is the sole owner of the neighbor, MAC, and interface
//! caches; every other component talks to it through the main queue.

pub mod cache;
pub mod config;
pub mod dump;
pub mod error;
pub mod ingress;
pub mod kernel;
pub mod msg;
pub mod npu;
pub mod proc;
pub mod resolve;
pub mod stats;
pub mod types;

pub use cache::{FdbType, Interface, MacEntry, MacKey, NbrKey, NbrRef, Neighbor};
pub use config::NbrMgrConfig;
pub use error::{NbrMgrError, Result};
pub use ingress::EventIngress;
pub use kernel::{KernelChannel, KernelError, NoopKernel};
pub use msg::{MsgType, NbrMsg};
pub use npu::{NoopNpu, NpuBackend, NpuError, NpuOp};
pub use proc::NbrProcessor;
pub use resolve::{Directive, DirectiveKind, Resolver};
pub use stats::{IngressStats, NbrCounters, ProcStats, ResolverStats};
pub use types::{
    DumpRequest, FlushRequest, IntfEntry, IntfFlags, NbrEntry, NbrFlags, NudState,
};
