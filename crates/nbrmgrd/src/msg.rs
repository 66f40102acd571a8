//! Tagged messages consumed by the neighbor processor.

use crate::types::{DumpRequest, FlushRequest, IntfEntry, NbrEntry};

/// Whether an event adds/updates or deletes an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Add,
    Del,
}

impl MsgType {
    pub fn is_add(&self) -> bool {
        matches!(self, MsgType::Add)
    }
}

/// The uniform message enqueued to the main queue.
///
/// Payloads arrive fully decoded; the processor never parses wire formats.
#[derive(Debug, Clone)]
pub enum NbrMsg {
    /// Interface add/update/delete from the link event stream.
    Intf(IntfEntry),
    /// IP neighbor event from the kernel neighbor table.
    Nbr(MsgType, NbrEntry),
    /// L2 FDB event from the bridge MAC table.
    Fdb(MsgType, NbrEntry),
    /// Proactive resolve request / stop-resolve from the control plane.
    ResolveReq(MsgType, NbrEntry),
    /// Flush request (interface, VRF, or global).
    Flush(FlushRequest),
    /// Cache snapshot request.
    Dump(DumpRequest),
}

impl NbrMsg {
    /// Short label used for counters and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NbrMsg::Intf(_) => "intf",
            NbrMsg::Nbr(..) => "nbr",
            NbrMsg::Fdb(..) => "fdb",
            NbrMsg::ResolveReq(..) => "resolve_req",
            NbrMsg::Flush(_) => "flush",
            NbrMsg::Dump(_) => "dump",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(NbrMsg::Intf(IntfEntry::default()).kind(), "intf");
        assert_eq!(
            NbrMsg::Nbr(MsgType::Add, NbrEntry::default()).kind(),
            "nbr"
        );
        assert_eq!(NbrMsg::Flush(FlushRequest::default()).kind(), "flush");
    }

    #[test]
    fn test_msg_type() {
        assert!(MsgType::Add.is_add());
        assert!(!MsgType::Del.is_add());
    }
}
