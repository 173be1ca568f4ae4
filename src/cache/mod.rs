//! Per-proxy caches and their gating matchers.
//!
//! # Design Decisions
//! - Both types are started and stopped as a whole; a stop discards state
//! - The serving path reads through `ArcSwapOption`, so a stop never waits
//!   on a reader and a reader never sees a half-built store
//! - A cache is always stopped before the configuration it was built from
//!   changes, and restarted (cold) afterwards

pub mod matcher;
pub mod store;

pub use matcher::Matcher;
pub use store::McCache;
