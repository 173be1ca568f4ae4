//! Proxy registry and reconfiguration.
//!
//! # Data Flow
//! ```text
//! (name, port, raw_config, version, BehaviorPool)
//!     → registry.rs  find (name, port) under the registry lock
//!     → absent:  listen.rs bind → instance.rs Proxy::new → link at head
//!     → present: instance.rs reconfigure (stop caches, swap, restart)
//!     → work::WorkerPool::refresh_mirrors
//!         → thread_data.rs on every serving thread
//!
//! After the whole update:
//!     registry.rs close_outdated_proxies → tombstone untouched proxies
//! ```
//!
//! # Design Decisions
//! - The registry is an explicit object, not a global; counters live on it
//! - Every change builds new values and swaps them in under the proxy lock
//! - Serving threads read only their own mirror

pub mod instance;
pub mod listen;
pub mod registry;
pub mod stats;
pub mod thread_data;

pub use instance::{Proxy, ProxyKey, ProxyState, UpdateOutcome};
pub use listen::{ListenError, ProxyListener, TcpListenerSet};
pub use registry::{PoolOutcome, ProxyMain, NULL_BUCKET};
pub use stats::{ProxyMainStats, StatsSnapshot};
pub use thread_data::{MirrorSet, MirrorSnapshot, ProxyThreadData};
