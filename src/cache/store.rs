//! Capacity-bounded item cache with start/stop lifecycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires: Instant,
    hits: u64,
}

#[derive(Debug)]
struct Store {
    max: usize,
    lifespan: Duration,
    items: DashMap<String, Entry>,
}

/// A bounded key/value cache that can be stopped and restarted.
///
/// Stopping discards every item; a stopped cache misses on every lookup and
/// ignores stores.
#[derive(Debug, Default)]
pub struct McCache {
    store: ArcSwapOption<Store>,
    starts: AtomicU64,
}

impl McCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start empty with room for `max` items living `lifespan_ms` each.
    pub fn start(&self, max: u32, lifespan_ms: u64) {
        self.store.store(Some(Arc::new(Store {
            max: max as usize,
            lifespan: Duration::from_millis(lifespan_ms),
            items: DashMap::new(),
        })));
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.store.store(None);
    }

    pub fn is_running(&self) -> bool {
        self.store.load().is_some()
    }

    /// How many times the cache has been started.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.store.load().as_ref().map_or(0, |s| s.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let guard = self.store.load();
        let store = guard.as_ref()?;

        {
            let mut entry = store.items.get_mut(key)?;
            if entry.expires > Instant::now() {
                entry.hits += 1;
                return Some(entry.value.clone());
            }
        }
        store.items.remove(key);
        None
    }

    pub fn set(&self, key: &str, value: &[u8]) {
        let guard = self.store.load();
        let Some(store) = guard.as_ref() else {
            return;
        };
        if store.max == 0 {
            return;
        }

        if store.items.len() >= store.max && !store.items.contains_key(key) {
            store.evict_one();
        }
        store.items.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires: Instant::now() + store.lifespan,
                hits: 0,
            },
        );
    }

    /// Count one occurrence of `key`, without storing a value.
    pub fn touch(&self, key: &str) {
        if self.get(key).is_none() {
            self.set(key, &[]);
        }
    }

    /// Hit count recorded for `key`, if cached.
    pub fn hits(&self, key: &str) -> Option<u64> {
        let guard = self.store.load();
        let store = guard.as_ref()?;
        store.items.get(key).map(|e| e.hits)
    }
}

impl Store {
    /// Drop an expired item if there is one, otherwise the least-hit item.
    fn evict_one(&self) {
        let now = Instant::now();
        let victim = self
            .items
            .iter()
            .min_by_key(|e| (e.expires > now, e.hits))
            .map(|e| e.key().clone());
        if let Some(key) = victim {
            self.items.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_cache_ignores_everything() {
        let cache = McCache::new();
        cache.set("k", b"v");
        assert!(cache.get("k").is_none());
        assert!(!cache.is_running());
    }

    #[test]
    fn test_get_set_and_stop() {
        let cache = McCache::new();
        cache.start(10, 60_000);
        cache.set("k", b"v");
        assert_eq!(cache.get("k").as_deref(), Some(&b"v"[..]));

        cache.stop();
        assert!(cache.get("k").is_none());

        cache.start(10, 60_000);
        assert!(cache.get("k").is_none(), "restart begins cold");
        assert_eq!(cache.starts(), 2);
    }

    #[test]
    fn test_capacity_bound() {
        let cache = McCache::new();
        cache.start(2, 60_000);
        cache.set("a", b"1");
        cache.set("b", b"2");
        cache.get("a");
        cache.set("c", b"3");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some(), "most-hit item survives");
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_expiry() {
        let cache = McCache::new();
        cache.start(10, 0);
        cache.set("k", b"v");
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_touch_counts_hits() {
        let cache = McCache::new();
        cache.start(10, 60_000);
        cache.touch("k");
        cache.touch("k");
        cache.touch("k");
        assert_eq!(cache.hits("k"), Some(2));
    }
}
