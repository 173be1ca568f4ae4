//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API (registry counters)
//! ```
//!
//! # Design Decisions
//! - Every state transition of a proxy is one log event with its key
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
