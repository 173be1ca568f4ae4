//! The registry of live proxies and the per-pool reconciler.
//!
//! # Responsibilities
//! - Own every `Proxy`, keyed by (name, port)
//! - Create a proxy for a new pool, or reconfigure the existing one in place
//! - Push each change to every serving thread before moving on
//! - Retire proxies a reconciliation pass did not touch
//! - Unlink tombstones one pass after their drain reached every mirror
//!
//! # Design Decisions
//! - The registry lock covers lookup and linking only. It is never held
//!   across socket binding or a worker fan-out, so a worker that needs the
//!   registry can never deadlock against a waiting control thread
//! - Each proxy has its own lock for its short field swap
//! - Config versions, not a "seen" set, tell touched proxies from stale ones

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::behavior::{Behavior, BehaviorPool};
use crate::config::ConfigEncoding;
use crate::error::AgentError;
use crate::observability::metrics;
use crate::proxy::instance::{Proxy, ProxyKey, UpdateOutcome};
use crate::proxy::listen::ProxyListener;
use crate::proxy::stats::ProxyMainStats;
use crate::work::WorkerPool;

/// Sentinel proxy that keeps the default listen port open with no backends.
/// It is never retired.
pub const NULL_BUCKET: &str = "[<NULL_BUCKET>]";

/// What reconciling one pool did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOutcome {
    /// A new proxy was created and is listening.
    Started,
    /// An existing proxy was reconfigured in place.
    Updated(UpdateOutcome),
}

/// Process-wide owner of the proxy registry.
#[derive(Debug)]
pub struct ProxyMain {
    proxies: Mutex<Vec<Arc<Proxy>>>,
    /// Version of the last pass that unlinked a proxy; later versions stay above it.
    removed_version: AtomicU32,
    behavior: Mutex<Behavior>,
    encoding: ConfigEncoding,
    stats: ProxyMainStats,
    workers: Arc<WorkerPool>,
    listener: Arc<dyn ProxyListener>,
}

impl ProxyMain {
    pub fn new(
        behavior: Behavior,
        encoding: ConfigEncoding,
        workers: Arc<WorkerPool>,
        listener: Arc<dyn ProxyListener>,
    ) -> Self {
        Self {
            proxies: Mutex::new(Vec::new()),
            removed_version: AtomicU32::new(0),
            behavior: Mutex::new(behavior),
            encoding,
            stats: ProxyMainStats::default(),
            workers,
            listener,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Vec<Arc<Proxy>>> {
        self.proxies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current default behavior.
    pub fn behavior(&self) -> Behavior {
        self.behavior
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    pub fn encoding(&self) -> ConfigEncoding {
        self.encoding
    }

    pub fn stats(&self) -> &ProxyMainStats {
        &self.stats
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    /// Snapshot of the registry, newest proxy first.
    pub fn proxies(&self) -> Vec<Arc<Proxy>> {
        self.registry().clone()
    }

    pub fn find(&self, name: &str, port: u16) -> Option<Arc<Proxy>> {
        self.registry()
            .iter()
            .find(|p| p.port() == port && p.name() == name)
            .cloned()
    }

    /// One past the highest version held by any proxy, unlinked ones included.
    pub fn next_config_version(&self) -> u32 {
        let max = self
            .registry()
            .iter()
            .map(|p| p.config_version())
            .max()
            .unwrap_or(0);
        max.max(self.removed_version.load(Ordering::Acquire)) + 1
    }

    /// Create the null bucket on the default listen port, if one is set.
    ///
    /// Returns whether a null bucket was started. A listen failure is
    /// counted like any other start failure and is not fatal.
    pub fn init_null_bucket(&self) -> bool {
        let behavior = self.behavior();
        if behavior.port_listen == 0 {
            return false;
        }

        let port = behavior.port_listen;
        let pool = BehaviorPool::empty(behavior);
        match self.on_config_pool(NULL_BUCKET, port, Some(""), 0, &pool) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(port, error = %e, "Null bucket not started");
                false
            }
        }
    }

    /// Create or reconfigure the proxy for (name, port).
    ///
    /// `raw_config == None` with an empty pool drives an existing proxy into
    /// its tombstone state.
    pub fn on_config_pool(
        &self,
        name: &str,
        port: u16,
        raw_config: Option<&str>,
        config_version: u32,
        behavior_pool: &BehaviorPool,
    ) -> Result<PoolOutcome, AgentError> {
        match self.find(name, port) {
            None => self.start_proxy(name, port, raw_config, config_version, behavior_pool),
            Some(proxy) => {
                tracing::debug!(proxy = %proxy.key(), "Existing proxy config change");
                Ok(self.update_proxy(&proxy, raw_config, config_version, behavior_pool))
            }
        }
    }

    fn start_proxy(
        &self,
        name: &str,
        port: u16,
        raw_config: Option<&str>,
        config_version: u32,
        behavior_pool: &BehaviorPool,
    ) -> Result<PoolOutcome, AgentError> {
        let key = ProxyKey::new(name, port);

        let sockets = match self.listener.listen(&key) {
            Ok(n) => n,
            Err(source) => {
                self.stats.proxy_start_failed();
                tracing::warn!(proxy = %key, config = ?raw_config, error = %source, "Proxy failed to listen");
                return Err(AgentError::Listen {
                    name: key.name,
                    port,
                    source,
                });
            }
        };

        let proxy = Arc::new(Proxy::new(key, raw_config, config_version, behavior_pool));
        let count = {
            let mut registry = self.registry();
            registry.insert(0, proxy.clone());
            registry.len()
        };
        metrics::set_proxy_count(count);
        self.stats.proxy_started();

        tracing::info!(
            proxy = %proxy.key(),
            config = ?raw_config,
            version = config_version,
            sockets,
            "Proxy started"
        );

        self.workers.refresh_mirrors(&proxy);
        Ok(PoolOutcome::Started)
    }

    fn update_proxy(
        &self,
        proxy: &Arc<Proxy>,
        raw_config: Option<&str>,
        config_version: u32,
        behavior_pool: &BehaviorPool,
    ) -> PoolOutcome {
        let outcome = proxy.reconfigure(raw_config, config_version, behavior_pool);

        if outcome.shutdown {
            self.stats.proxy_shutdown();
            tracing::info!(proxy = %proxy.key(), version = config_version, "Proxy shut down");
        } else {
            self.stats.proxy_updated();
            tracing::info!(
                proxy = %proxy.key(),
                version = config_version,
                changed = outcome.changed,
                "Proxy updated"
            );
        }

        self.workers.refresh_mirrors(proxy);
        PoolOutcome::Updated(outcome)
    }

    /// Retire every proxy the pass at `new_version` did not touch.
    ///
    /// The null bucket and proxies that are already tombstones are left
    /// alone. Returns the number of proxies retired.
    pub fn close_outdated_proxies(&self, new_version: u32) -> usize {
        let empty_pool = BehaviorPool::empty(self.behavior());

        let stale: Vec<ProxyKey> = self
            .proxies()
            .iter()
            .filter(|p| p.name() != NULL_BUCKET)
            .filter(|p| {
                let state = p.lock_state();
                state.config_version != new_version && !state.is_tombstone()
            })
            .map(|p| p.key().clone())
            .collect();

        for key in &stale {
            tracing::info!(proxy = %key, version = new_version, "Retiring outdated proxy");
            if let Err(e) = self.on_config_pool(&key.name, key.port, None, new_version, &empty_pool) {
                tracing::warn!(proxy = %key, error = %e, "Failed to retire proxy");
            }
        }

        stale.len()
    }

    /// Unlink tombstones retired before the pass at `new_version` and not
    /// revived by it.
    ///
    /// Their drain already reached every mirror, so the mirrors are dropped
    /// and the proxy leaves the registry. Returns the number removed.
    pub fn remove_drained_proxies(&self, new_version: u32) -> usize {
        let drained: Vec<Arc<Proxy>> = self
            .proxies()
            .into_iter()
            .filter(|p| {
                let state = p.lock_state();
                state.is_tombstone() && state.config_version < new_version
            })
            .collect();

        for proxy in &drained {
            self.workers.drop_mirrors(proxy.key());
            metrics::record_proxy_event("removed");
            tracing::info!(proxy = %proxy.key(), "Drained proxy removed");
        }

        if !drained.is_empty() {
            self.removed_version.fetch_max(new_version, Ordering::AcqRel);
            let count = {
                let mut registry = self.registry();
                registry.retain(|p| !drained.iter().any(|d| Arc::ptr_eq(d, p)));
                registry.len()
            };
            metrics::set_proxy_count(count);
        }

        drained.len()
    }
}
