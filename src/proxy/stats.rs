//! Process-wide reconfiguration counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::observability::metrics;

/// Counters bumped as side effects of reconfiguration.
#[derive(Debug, Default)]
pub struct ProxyMainStats {
    configs: AtomicU64,
    config_fails: AtomicU64,
    pool_fails: AtomicU64,
    proxy_starts: AtomicU64,
    proxy_start_fails: AtomicU64,
    proxy_existings: AtomicU64,
    proxy_shutdowns: AtomicU64,
}

/// Point-in-time copy of [`ProxyMainStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub configs: u64,
    pub config_fails: u64,
    pub pool_fails: u64,
    pub proxy_starts: u64,
    pub proxy_start_fails: u64,
    pub proxy_existings: u64,
    pub proxy_shutdowns: u64,
}

impl ProxyMainStats {
    pub fn config_received(&self) {
        self.configs.fetch_add(1, Ordering::Relaxed);
        metrics::record_config_received();
    }

    /// Returns the failure count including this one.
    pub fn config_failed(&self) -> u64 {
        metrics::record_config_failure();
        self.config_fails.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn pool_failed(&self) {
        self.pool_fails.fetch_add(1, Ordering::Relaxed);
        metrics::record_pool_failure();
    }

    pub fn proxy_started(&self) {
        self.proxy_starts.fetch_add(1, Ordering::Relaxed);
        metrics::record_proxy_event("started");
    }

    pub fn proxy_start_failed(&self) {
        self.proxy_start_fails.fetch_add(1, Ordering::Relaxed);
        metrics::record_proxy_event("start_failed");
    }

    pub fn proxy_updated(&self) {
        self.proxy_existings.fetch_add(1, Ordering::Relaxed);
        metrics::record_proxy_event("updated");
    }

    pub fn proxy_shutdown(&self) {
        self.proxy_shutdowns.fetch_add(1, Ordering::Relaxed);
        metrics::record_proxy_event("shutdown");
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            configs: self.configs.load(Ordering::Relaxed),
            config_fails: self.config_fails.load(Ordering::Relaxed),
            pool_fails: self.pool_fails.load(Ordering::Relaxed),
            proxy_starts: self.proxy_starts.load(Ordering::Relaxed),
            proxy_start_fails: self.proxy_start_fails.load(Ordering::Relaxed),
            proxy_existings: self.proxy_existings.load(Ordering::Relaxed),
            proxy_shutdowns: self.proxy_shutdowns.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.configs,
            &self.config_fails,
            &self.pool_fails,
            &self.proxy_starts,
            &self.proxy_start_fails,
            &self.proxy_existings,
            &self.proxy_shutdowns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let stats = ProxyMainStats::default();
        stats.config_received();
        stats.proxy_started();
        stats.proxy_started();
        assert_eq!(stats.config_failed(), 1);

        let snap = stats.snapshot();
        assert_eq!(snap.configs, 1);
        assert_eq!(snap.proxy_starts, 2);
        assert_eq!(snap.config_fails, 1);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
