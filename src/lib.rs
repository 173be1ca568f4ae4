//! Dynamically reconfigured multithreaded key-value proxy agent.
//!
//! A control thread reconciles each topology update against the live
//! proxies, one pool at a time, and pushes every change to the serving
//! threads' private mirrors before moving on.

// Reconfiguration core
pub mod agent;
pub mod behavior;
pub mod proxy;
pub mod work;

// Per-proxy caches
pub mod cache;

// Cross-cutting concerns
pub mod admin;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use agent::{KvPairs, PassReport};
pub use behavior::{Behavior, BehaviorPool};
pub use config::AgentConfig;
pub use error::AgentError;
pub use lifecycle::Shutdown;
pub use proxy::{Proxy, ProxyKey, ProxyMain};
pub use work::{WorkCollect, WorkerPool};
