//! Backend tuning parameters.
//!
//! # Data Flow
//! ```text
//! default Behavior (agent config [behavior])
//!     → behavior-<pool> properties (pool base)
//!     → svr-<server> properties (one entry per server, inheriting the base)
//!     → BehaviorPool { base, entries }
//!     → connection string "host:port[:weight],..."
//! ```
//!
//! # Design Decisions
//! - `Behavior` is a plain value: cloning is a full copy, never shared
//! - Equality is field-wise; a pool compares base plus entries in order
//! - String fields are bounded to fixed capacities when parsed

pub mod pool;
pub mod record;

pub use pool::BehaviorPool;
pub use record::Behavior;
