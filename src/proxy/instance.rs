//! Canonical runtime state for one (name, port) proxy.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::behavior::{Behavior, BehaviorPool};
use crate::cache::{Matcher, McCache};

/// A name and listen port uniquely identify a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyKey {
    pub name: String,
    pub port: u16,
}

impl ProxyKey {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.port)
    }
}

/// The mutable part of a proxy, guarded by the proxy's own lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyState {
    /// Backend configuration text; `None` marks a tombstone.
    pub raw_config: Option<String>,
    pub behavior_pool: BehaviorPool,
    pub config_version: u32,
}

impl ProxyState {
    /// True once the proxy has been told to drain.
    pub fn is_tombstone(&self) -> bool {
        self.raw_config.is_none()
    }

    /// A proxy needs both a config and at least one server to serve.
    pub fn has_valid_config(&self) -> bool {
        self.raw_config.is_some() && !self.behavior_pool.is_empty()
    }

    /// Replace config and behavior pool.
    ///
    /// Identical content is left in place; anything else is swapped for a
    /// fresh copy. The base is always overwritten. Only dropping a value
    /// that was held counts as a change, so filling in a tombstone does not.
    pub fn replace_from(&mut self, raw_config: Option<&str>, pool: &BehaviorPool) -> bool {
        let mut changed = replace_config(&mut self.raw_config, raw_config);

        changed = (self.behavior_pool.base != pool.base) || changed;
        self.behavior_pool.base = pool.base.clone();

        replace_entries(&mut self.behavior_pool.entries, &pool.entries) || changed
    }
}

/// Swap in `next` unless it is byte-identical (after trimming) to `curr`.
///
/// Returns true when a held string was dropped.
pub(crate) fn replace_config(curr: &mut Option<String>, next: Option<&str>) -> bool {
    let next = next.map(str::trim);
    if curr.as_deref() == next {
        return false;
    }
    let dropped = curr.take().is_some();
    *curr = next.map(str::to_string);
    dropped
}

/// Swap in a copy of `next` unless it is element-wise equal to `curr`.
///
/// Returns true when held entries were dropped.
pub(crate) fn replace_entries(curr: &mut Vec<Behavior>, next: &[Behavior]) -> bool {
    if curr.as_slice() == next {
        return false;
    }
    let dropped = !curr.is_empty();
    *curr = next.to_vec();
    dropped
}

/// Result of reconfiguring an existing proxy in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// A stored config text or behavior was replaced or dropped.
    pub changed: bool,
    /// The proxy is left without a usable configuration.
    pub shutdown: bool,
}

/// One proxy: immutable identity, locked state, and its front caches.
#[derive(Debug)]
pub struct Proxy {
    key: ProxyKey,
    state: Mutex<ProxyState>,
    front_cache: McCache,
    front_cache_matcher: Matcher,
    front_cache_unmatcher: Matcher,
    optimize_set_matcher: Matcher,
}

impl Proxy {
    /// Build a proxy and start its caches for the given configuration.
    pub fn new(
        key: ProxyKey,
        raw_config: Option<&str>,
        config_version: u32,
        behavior_pool: &BehaviorPool,
    ) -> Self {
        let proxy = Self {
            key,
            state: Mutex::new(ProxyState {
                raw_config: raw_config.map(|c| c.trim().to_string()),
                behavior_pool: behavior_pool.clone(),
                config_version,
            }),
            front_cache: McCache::new(),
            front_cache_matcher: Matcher::new(),
            front_cache_unmatcher: Matcher::new(),
            optimize_set_matcher: Matcher::new(),
        };
        if raw_config.is_some() {
            proxy.start_caches(&behavior_pool.base);
        }
        proxy
    }

    pub fn key(&self) -> &ProxyKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn port(&self) -> u16 {
        self.key.port
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ProxyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ProxyState {
        self.lock_state().clone()
    }

    pub fn config_version(&self) -> u32 {
        self.lock_state().config_version
    }

    pub fn is_tombstone(&self) -> bool {
        self.lock_state().is_tombstone()
    }

    /// Apply a new configuration in place.
    ///
    /// Caches stop before the state is touched and restart only after the
    /// proxy lock is released, and only when the proxy stays serviceable.
    pub fn reconfigure(
        &self,
        raw_config: Option<&str>,
        config_version: u32,
        behavior_pool: &BehaviorPool,
    ) -> UpdateOutcome {
        self.stop_caches();

        let outcome = {
            let mut state = self.lock_state();

            if tracing::enabled!(tracing::Level::DEBUG) {
                if let (Some(old), Some(new)) = (state.raw_config.as_deref(), raw_config) {
                    if old != new.trim() {
                        tracing::debug!(proxy = %self.key, from = %old, to = %new, "Config text changed");
                    }
                }
            }

            let changed = state.replace_from(raw_config, behavior_pool);
            let shutdown = !state.has_valid_config();

            if state.config_version == config_version {
                tracing::warn!(
                    proxy = %self.key,
                    version = config_version,
                    "Proxy configured twice in one pass, last one wins"
                );
            }
            state.config_version = config_version;

            UpdateOutcome { changed, shutdown }
        };

        if !outcome.shutdown {
            self.start_caches(&behavior_pool.base);
        }

        outcome
    }

    fn stop_caches(&self) {
        self.front_cache.stop();
        self.front_cache_matcher.stop();
        self.front_cache_unmatcher.stop();
        self.optimize_set_matcher.stop();
    }

    fn start_caches(&self, base: &Behavior) {
        if base.front_cache_enabled() {
            self.front_cache
                .start(base.front_cache_max, base.front_cache_lifespan);

            if !base.front_cache_spec.is_empty() {
                self.front_cache_matcher.start(&base.front_cache_spec);
            }
            if !base.front_cache_unspec.is_empty() {
                self.front_cache_unmatcher.start(&base.front_cache_unspec);
            }
        }

        if !base.optimize_set.is_empty() {
            self.optimize_set_matcher.start(&base.optimize_set);
        }
    }

    /// The response cache, for inspection.
    pub fn front_cache(&self) -> &McCache {
        &self.front_cache
    }

    fn front_cacheable(&self, key: &str) -> bool {
        self.front_cache_matcher.check(key, true) && !self.front_cache_unmatcher.check(key, false)
    }

    /// Look up a cached response for `key`.
    pub fn front_cache_get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.front_cacheable(key) {
            return None;
        }
        self.front_cache.get(key)
    }

    /// Cache a response for `key` when the matchers allow it.
    pub fn front_cache_set(&self, key: &str, value: &[u8]) {
        if self.front_cacheable(key) {
            self.front_cache.set(key, value);
        }
    }

    /// Whether a set on `key` may take the optimized path.
    pub fn optimize_set(&self, key: &str) -> bool {
        self.optimize_set_matcher.check(key, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(servers: &[(&str, u16)]) -> BehaviorPool {
        let mut pool = BehaviorPool::default();
        for (host, port) in servers {
            let entry = pool.push_inherited();
            entry.host = host.to_string();
            entry.port = *port;
        }
        pool
    }

    #[test]
    fn test_replace_config() {
        let mut curr = Some("a:1".to_string());
        assert!(!replace_config(&mut curr, Some("a:1")));
        assert!(!replace_config(&mut curr, Some(" a:1 ")));
        assert!(replace_config(&mut curr, Some("a:2")));
        assert_eq!(curr.as_deref(), Some("a:2"));
        assert!(replace_config(&mut curr, None));
        assert!(curr.is_none());
        assert!(!replace_config(&mut curr, None));

        // Filling an empty slot copies without counting as a change.
        assert!(!replace_config(&mut curr, Some("b:1")));
        assert_eq!(curr.as_deref(), Some("b:1"));
    }

    #[test]
    fn test_replace_entries() {
        let one = pool(&[("h", 1)]).entries;
        let two = pool(&[("h", 1), ("h", 2)]).entries;

        let mut curr = Vec::new();
        assert!(!replace_entries(&mut curr, &one));
        assert_eq!(curr, one);
        assert!(!replace_entries(&mut curr, &one));
        assert!(replace_entries(&mut curr, &two));
        assert_eq!(curr, two);
        assert!(replace_entries(&mut curr, &[]));
        assert!(curr.is_empty());
    }

    #[test]
    fn test_revive_tombstone_same_base_unchanged() {
        let p = pool(&[("h", 1)]);
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);
        proxy.reconfigure(None, 2, &BehaviorPool::empty(p.base.clone()));
        assert!(proxy.is_tombstone());

        let outcome = proxy.reconfigure(Some("h:1"), 3, &p);
        assert_eq!(outcome, UpdateOutcome { changed: false, shutdown: false });
        assert_eq!(proxy.snapshot().behavior_pool, p);
        assert!(!proxy.is_tombstone());
    }

    #[test]
    fn test_reconfigure_unchanged() {
        let p = pool(&[("h", 1)]);
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);

        let outcome = proxy.reconfigure(Some("h:1"), 2, &p);
        assert_eq!(outcome, UpdateOutcome { changed: false, shutdown: false });
        assert_eq!(proxy.config_version(), 2);
    }

    #[test]
    fn test_reconfigure_base_change() {
        let p = pool(&[("h", 1)]);
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);

        let mut q = p.clone();
        q.base.downstream_max = 4;
        let outcome = proxy.reconfigure(Some("h:1"), 2, &q);
        assert!(outcome.changed);
        assert_eq!(proxy.snapshot().behavior_pool.base.downstream_max, 4);
    }

    #[test]
    fn test_reconfigure_to_tombstone() {
        let p = pool(&[("h", 1)]);
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);

        let outcome = proxy.reconfigure(None, 2, &BehaviorPool::default());
        assert_eq!(outcome, UpdateOutcome { changed: true, shutdown: true });
        assert!(proxy.is_tombstone());
        assert!(proxy.snapshot().behavior_pool.is_empty());
    }

    #[test]
    fn test_front_cache_restart() {
        let mut p = pool(&[("h", 1)]);
        p.base.front_cache_max = 10;
        p.base.front_cache_lifespan = 60_000;
        p.base.front_cache_spec = "user:".into();
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);
        assert_eq!(proxy.front_cache().starts(), 1);

        proxy.front_cache_set("user:1", b"x");
        proxy.front_cache_set("other", b"y");
        assert_eq!(proxy.front_cache_get("user:1").as_deref(), Some(&b"x"[..]));
        assert!(proxy.front_cache_get("other").is_none());

        proxy.reconfigure(Some("h:1"), 2, &p);
        assert_eq!(proxy.front_cache().starts(), 2);
        assert!(proxy.front_cache_get("user:1").is_none(), "restarted cold");

        proxy.reconfigure(None, 3, &BehaviorPool::default());
        assert!(!proxy.front_cache().is_running());
    }

    #[test]
    fn test_optimize_set() {
        let mut p = pool(&[("h", 1)]);
        p.base.optimize_set = "big:".into();
        let proxy = Proxy::new(ProxyKey::new("p1", 11300), Some("h:1"), 1, &p);
        assert!(proxy.optimize_set("big:1"));
        assert!(!proxy.optimize_set("small:1"));
    }
}
