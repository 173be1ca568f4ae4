//! Per-thread copies of proxy configuration.
//!
//! Each serving thread keeps its own `ProxyThreadData` per proxy and reads
//! it without taking any lock shared with the control thread. Only the
//! owning thread mutates it, when a refresh arrives on its work queue.

use std::collections::HashMap;

use serde::Serialize;

use crate::behavior::BehaviorPool;
use crate::cache::{Matcher, McCache};
use crate::proxy::instance::{Proxy, ProxyKey, ProxyState};

/// One thread's mirror of one proxy.
#[derive(Debug)]
pub struct ProxyThreadData {
    thread: usize,
    /// `None` until the first refresh.
    config_version: Option<u32>,
    raw_config: Option<String>,
    behavior_pool: BehaviorPool,
    key_stats: McCache,
    key_stats_matcher: Matcher,
    key_stats_unmatcher: Matcher,
}

/// What a thread reports about its mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorSnapshot {
    pub thread: usize,
    pub config_version: Option<u32>,
    pub raw_config: Option<String>,
    pub servers: usize,
    pub key_stats_running: bool,
    pub key_stats_starts: u64,
}

impl ProxyThreadData {
    pub fn new(thread: usize) -> Self {
        Self {
            thread,
            config_version: None,
            raw_config: None,
            behavior_pool: BehaviorPool::default(),
            key_stats: McCache::new(),
            key_stats_matcher: Matcher::new(),
            key_stats_unmatcher: Matcher::new(),
        }
    }

    /// Catch up with the proxy's canonical state.
    ///
    /// Nothing is copied when the versions already agree. Returns whether the
    /// mirrored content differs from before, in which case key stats were
    /// restarted. A first copy or a revived tombstone always differs.
    pub fn refresh(&mut self, proxy: &Proxy) -> bool {
        let prev = self.config_version;

        let (changed, version) = {
            let state = proxy.lock_state();
            if self.config_version == Some(state.config_version) {
                (false, state.config_version)
            } else {
                (self.copy_from(&state), state.config_version)
            }
        };

        if changed {
            self.restart_key_stats();
            tracing::debug!(
                proxy = %proxy.key(),
                thread = self.thread,
                from = ?prev,
                to = version,
                "Mirror updated"
            );
        } else {
            tracing::trace!(proxy = %proxy.key(), thread = self.thread, version, "Mirror unchanged");
        }

        changed
    }

    fn copy_from(&mut self, state: &ProxyState) -> bool {
        self.config_version = Some(state.config_version);
        let differs = self.raw_config != state.raw_config || self.behavior_pool != state.behavior_pool;

        let mut mirror = ProxyState {
            raw_config: self.raw_config.take(),
            behavior_pool: std::mem::take(&mut self.behavior_pool),
            config_version: state.config_version,
        };
        mirror.replace_from(state.raw_config.as_deref(), &state.behavior_pool);

        self.raw_config = mirror.raw_config;
        self.behavior_pool = mirror.behavior_pool;
        differs
    }

    fn restart_key_stats(&self) {
        self.key_stats.stop();
        self.key_stats_matcher.stop();
        self.key_stats_unmatcher.stop();

        if self.raw_config.is_none() {
            return;
        }

        let base = &self.behavior_pool.base;
        if base.key_stats_enabled() {
            self.key_stats.start(base.key_stats_max, base.key_stats_lifespan);

            if !base.key_stats_spec.is_empty() {
                self.key_stats_matcher.start(&base.key_stats_spec);
            }
            if !base.key_stats_unspec.is_empty() {
                self.key_stats_unmatcher.start(&base.key_stats_unspec);
            }
        }
    }

    pub fn config_version(&self) -> Option<u32> {
        self.config_version
    }

    pub fn raw_config(&self) -> Option<&str> {
        self.raw_config.as_deref()
    }

    pub fn behavior_pool(&self) -> &BehaviorPool {
        &self.behavior_pool
    }

    /// Count a request for `key` when the key stats matchers allow it.
    pub fn record_key_stat(&self, key: &str) {
        if self.key_stats_matcher.check(key, true) && !self.key_stats_unmatcher.check(key, false) {
            self.key_stats.touch(key);
        }
    }

    /// Requests counted for `key` beyond the first, if tracked.
    pub fn key_stat_hits(&self, key: &str) -> Option<u64> {
        self.key_stats.hits(key)
    }

    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot {
            thread: self.thread,
            config_version: self.config_version,
            raw_config: self.raw_config.clone(),
            servers: self.behavior_pool.len(),
            key_stats_running: self.key_stats.is_running(),
            key_stats_starts: self.key_stats.starts(),
        }
    }
}

/// Every mirror owned by one thread.
#[derive(Debug)]
pub struct MirrorSet {
    thread: usize,
    mirrors: HashMap<ProxyKey, ProxyThreadData>,
}

impl MirrorSet {
    pub fn new(thread: usize) -> Self {
        Self {
            thread,
            mirrors: HashMap::new(),
        }
    }

    /// Refresh (creating on first sight) this thread's mirror of `proxy`.
    pub fn refresh(&mut self, proxy: &Proxy) -> bool {
        let thread = self.thread;
        self.mirrors
            .entry(proxy.key().clone())
            .or_insert_with(|| ProxyThreadData::new(thread))
            .refresh(proxy)
    }

    pub fn remove(&mut self, key: &ProxyKey) -> Option<ProxyThreadData> {
        self.mirrors.remove(key)
    }

    pub fn get(&self, key: &ProxyKey) -> Option<&ProxyThreadData> {
        self.mirrors.get(key)
    }

    pub fn snapshot(&self, key: &ProxyKey) -> Option<MirrorSnapshot> {
        self.mirrors.get(key).map(ProxyThreadData::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;

    fn key_stats_pool() -> BehaviorPool {
        let mut pool = BehaviorPool::empty(Behavior {
            key_stats_max: 10,
            key_stats_lifespan: 60_000,
            key_stats_unspec: "tmp:".into(),
            ..Behavior::default()
        });
        let entry = pool.push_inherited();
        entry.host = "h".into();
        entry.port = 1;
        pool
    }

    #[test]
    fn test_first_refresh_seeds_and_starts_key_stats() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 3, &pool);
        let mut mirror = ProxyThreadData::new(1);

        assert!(mirror.refresh(&proxy));
        assert_eq!(mirror.config_version(), Some(3));
        assert_eq!(mirror.raw_config(), Some("h:1"));
        assert_eq!(mirror.behavior_pool(), &pool);

        let snap = mirror.snapshot();
        assert!(snap.key_stats_running);
        assert_eq!(snap.key_stats_starts, 1);
    }

    #[test]
    fn test_same_version_is_noop() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 3, &pool);
        let mut mirror = ProxyThreadData::new(1);
        mirror.refresh(&proxy);

        assert!(!mirror.refresh(&proxy));
        assert_eq!(mirror.snapshot().key_stats_starts, 1);
    }

    #[test]
    fn test_new_version_same_content_keeps_key_stats() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 3, &pool);
        let mut mirror = ProxyThreadData::new(1);
        mirror.refresh(&proxy);
        mirror.record_key_stat("k");
        mirror.record_key_stat("k");

        proxy.reconfigure(Some("h:1"), 4, &pool);
        assert!(!mirror.refresh(&proxy));
        assert_eq!(mirror.config_version(), Some(4));
        assert_eq!(mirror.key_stat_hits("k"), Some(1));
    }

    #[test]
    fn test_tombstone_stops_key_stats() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 3, &pool);
        let mut mirror = ProxyThreadData::new(2);
        mirror.refresh(&proxy);

        proxy.reconfigure(None, 4, &BehaviorPool::default());
        assert!(mirror.refresh(&proxy));

        let snap = mirror.snapshot();
        assert_eq!(snap.raw_config, None);
        assert_eq!(snap.servers, 0);
        assert!(!snap.key_stats_running);
    }

    #[test]
    fn test_revived_tombstone_restarts_key_stats() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 3, &pool);
        let mut mirror = ProxyThreadData::new(1);
        mirror.refresh(&proxy);

        proxy.reconfigure(None, 4, &BehaviorPool::empty(pool.base.clone()));
        mirror.refresh(&proxy);
        assert!(!mirror.snapshot().key_stats_running);

        let outcome = proxy.reconfigure(Some("h:1"), 5, &pool);
        assert!(!outcome.changed);
        assert!(mirror.refresh(&proxy));

        let snap = mirror.snapshot();
        assert_eq!(snap.raw_config.as_deref(), Some("h:1"));
        assert!(snap.key_stats_running);
        assert_eq!(snap.key_stats_starts, 2);
    }

    #[test]
    fn test_key_stat_gating() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 1, &pool);
        let mut mirror = ProxyThreadData::new(1);
        mirror.refresh(&proxy);

        mirror.record_key_stat("tmp:1");
        mirror.record_key_stat("user:1");
        assert_eq!(mirror.key_stat_hits("tmp:1"), None);
        assert_eq!(mirror.key_stat_hits("user:1"), Some(0));
    }

    #[test]
    fn test_mirror_set() {
        let pool = key_stats_pool();
        let proxy = Proxy::new(ProxyKey::new("p", 1), Some("h:1"), 1, &pool);
        let mut set = MirrorSet::new(5);

        assert!(set.snapshot(proxy.key()).is_none());
        set.refresh(&proxy);
        let snap = set.snapshot(proxy.key()).unwrap();
        assert_eq!(snap.thread, 5);
        assert_eq!(snap.config_version, Some(1));
        assert!(set.get(proxy.key()).is_some());
    }
}
