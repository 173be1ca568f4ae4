//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Worker pool → Registry → Null bucket
//!     → Initial topology (blocking) → Watcher / admin tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop topology loop and admin API → Stop workers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger topology reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then workers, then proxies
//! - Workers stop last, after nothing can submit to them

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, ReloadSignal};
pub use startup::start_agent;
