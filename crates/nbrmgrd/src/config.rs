//! Daemon configuration.

use nbr_types::Family;
use std::collections::HashMap;
use std::time::Duration;

/// The default VRF every L2 interface lives in.
pub const DEFAULT_VRF_ID: u32 = 0;

/// Directives forwarded to the kernel per burst.
pub const BURST_RESOLVE_CNT: usize = 300;
/// Pacing interval of the burst resolver.
pub const BURST_RESOLVE_DELAY: Duration = Duration::from_secs(1);
/// Pacing interval of the delayed resolver, used for MAC-learn-pending
/// refreshes so a link with MAC learning disabled is not hammered.
pub const DELAY_BURST_RESOLVE_DELAY: Duration = Duration::from_secs(5);
/// Resolve/refresh attempts before a neighbor waits for an FDB event.
pub const MAX_NBR_RETRY_CNT: u32 = 10;
/// Refresh attempts waiting for the NPU to learn a MAC.
pub const MAX_NBR_REFRESH_MAC_LEARN_RETRY_CNT: u32 = 100;

/// Runtime configuration of the neighbor manager.
#[derive(Debug, Clone)]
pub struct NbrMgrConfig {
    /// Bound of the main event queue.
    pub main_queue_depth: usize,
    /// Bound of each directive queue.
    pub directive_queue_depth: usize,
    /// Directives per pacing window.
    pub burst_count: usize,
    /// Pacing window of the burst resolver.
    pub burst_interval: Duration,
    /// Pacing window of the delayed resolver.
    pub delay_interval: Duration,
    /// Resolve/refresh attempts before waiting for an FDB event.
    pub max_nbr_retry: u32,
    /// Refresh attempts waiting for hardware MAC learning.
    pub max_mac_learn_retry: u32,
    /// Refresh-on-stale default per address family.
    pub auto_refresh_v4: bool,
    pub auto_refresh_v6: bool,
    /// Per-VRF overrides of the family default, keyed by VRF name.
    pub auto_refresh_overrides: HashMap<(String, Family), bool>,
}

impl Default for NbrMgrConfig {
    fn default() -> Self {
        Self {
            main_queue_depth: 10_000,
            directive_queue_depth: 10_000,
            burst_count: BURST_RESOLVE_CNT,
            burst_interval: BURST_RESOLVE_DELAY,
            delay_interval: DELAY_BURST_RESOLVE_DELAY,
            max_nbr_retry: MAX_NBR_RETRY_CNT,
            max_mac_learn_retry: MAX_NBR_REFRESH_MAC_LEARN_RETRY_CNT,
            auto_refresh_v4: true,
            auto_refresh_v6: true,
            auto_refresh_overrides: HashMap::new(),
        }
    }
}

impl NbrMgrConfig {
    /// Whether stale neighbors in `vrf_name`/`family` should be refreshed
    /// automatically.
    pub fn auto_refresh_on_stale(&self, vrf_name: &str, family: Family) -> bool {
        if let Some(v) = self
            .auto_refresh_overrides
            .get(&(vrf_name.to_string(), family))
        {
            return *v;
        }
        match family {
            Family::Inet4 => self.auto_refresh_v4,
            Family::Inet6 => self.auto_refresh_v6,
            Family::Bridge => false,
        }
    }

    /// Sets a per-VRF auto-refresh override.
    pub fn set_auto_refresh_override(
        &mut self,
        vrf_name: impl Into<String>,
        family: Family,
        enabled: bool,
    ) {
        self.auto_refresh_overrides
            .insert((vrf_name.into(), family), enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cfg = NbrMgrConfig::default();
        assert_eq!(cfg.burst_count, 300);
        assert_eq!(cfg.burst_interval, Duration::from_secs(1));
        assert_eq!(cfg.delay_interval, Duration::from_secs(5));
        assert_eq!(cfg.max_nbr_retry, 10);
        assert_eq!(cfg.max_mac_learn_retry, 100);
    }

    #[test]
    fn test_auto_refresh_family_default() {
        let mut cfg = NbrMgrConfig::default();
        assert!(cfg.auto_refresh_on_stale("default", Family::Inet4));
        cfg.auto_refresh_v4 = false;
        assert!(!cfg.auto_refresh_on_stale("default", Family::Inet4));
        assert!(cfg.auto_refresh_on_stale("default", Family::Inet6));
    }

    #[test]
    fn test_auto_refresh_vrf_override() {
        let mut cfg = NbrMgrConfig::default();
        cfg.set_auto_refresh_override("mgmt", Family::Inet6, false);
        assert!(!cfg.auto_refresh_on_stale("mgmt", Family::Inet6));
        assert!(cfg.auto_refresh_on_stale("mgmt", Family::Inet4));
        assert!(cfg.auto_refresh_on_stale("default", Family::Inet6));
    }
}
