//! Configuration ingestion.
//!
//! # Data Flow
//! ```text
//! topology source (file watcher, SIGHUP)
//!     → KvPairs
//!     → ProxyMain::on_new_config   blocks on a size-1 WorkCollect
//!     → WorkItem::ApplyConfig on the control thread
//!     → ProxyMain::apply_config
//!         RECEIVED   configs += 1, version = 1 + max(version)
//!         PARSED     kvs_config.rs | json_config.rs (structural errors abort here)
//!         RECONCILING  ProxyMain::on_config_pool per pool, in order
//!         SWEEPING   ProxyMain::close_outdated_proxies
//!     → completion.signal_one()
//! ```
//!
//! # Design Decisions
//! - No rollback: pools reconciled before a later failure keep their update
//! - The caller is always released, whatever the pass outcome
//! - The encoding is fixed per process by the agent config

pub mod ingest;
pub mod json_config;
pub mod kvs;
pub mod kvs_config;

pub use ingest::PassReport;
pub use json_config::DEFAULT_BUCKET;
pub use kvs::KvPairs;
pub use kvs_config::{parse_kvs_behavior, parse_kvs_servers};
