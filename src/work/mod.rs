//! Control-to-worker coordination.
//!
//! # Data Flow
//! ```text
//! control thread (0)
//!     → WorkCollect::new(N - 1)
//!     → WorkItem::RefreshMirror / DropMirror to threads 1..N (one queue each)
//!     → WorkCollect::wait()  (the only blocking point of a pool update)
//!
//! worker thread i
//!     → drains its queue between I/O events
//!     → refreshes or drops its own mirror, then signal_one()
//! ```
//!
//! # Design Decisions
//! - Typed work items instead of function pointer + argument pairs
//! - All-or-nothing barrier: the thread count is small and fixed
//! - Workers never block on the control thread

pub mod collect;
pub mod workers;

pub use collect::WorkCollect;
pub use workers::{current_worker, WorkError, WorkItem, WorkerPool, CONTROL_THREAD};
