//! iopool
//
// `iopool` is a multi-queue worker pool for blocking and long-running IO
// tasks. Each worker thread owns a private FIFO and cooperatively drains a
// set of shared queues that have no thread of their own.
//
// ## Features
// - Per-worker queues with two-class priority (high-priority tasks run
//   before any queued standard task, FIFO within each class).
// - A shared queue set drained by every worker, with an optional
//   load-balancing mode that scans all shared queues on every fetch.
// - Blocking idle workers (condition variable) or polling with a
//   linear/exponential backoff ramp.
// - Per-queue counters and clean, idempotent termination.

mod backoff;
mod errors;
mod macros;
pub mod metrics;
pub mod pool;
mod queue;
mod stealer;
mod sync;

pub use backoff::BackoffPolicy;
pub use errors::EnqueueError;
pub use metrics::StatsSnapshot;
pub use pool::task::IoTask;
pub use pool::worker::IoQueue;
pub use pool::{IoPool, IoPoolBuilder};
