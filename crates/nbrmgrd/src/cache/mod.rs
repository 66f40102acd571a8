//! In-memory caches owned by the neighbor processor.
//!
//! Cross-entity references are stored as keys, never as pointers: a
//! neighbor names its MAC by [`MacKey`], a MAC names its neighbors by
//! [`NbrRef`]. Lookups always go through the owning store, so a stale
//! reference can only miss, never dangle.

mod interface;
mod mac;
mod neighbor;

pub use interface::{Interface, InterfaceStore};
pub use mac::{FdbType, MacEntry, MacKey, MacStore};
pub use neighbor::{IfNbrIndex, NbrKey, NbrRef, Neighbor, NeighborStore};
