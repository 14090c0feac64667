//! Per-queue counters.
//!
//! These are observability only; no pool decision reads them. All counters
//! are monotonic except `num_elements`, which tracks the queue population
//! and is never observed negative.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

pub struct QueueStatistics {
    posted: AtomicU64,
    completed: AtomicU64,
    errored: AtomicU64,
    high_priority: AtomicU64,
    shared_completed: AtomicU64,
    shared_errored: AtomicU64,
    num_elements: AtomicI64,
}

impl QueueStatistics {
    pub(crate) fn new() -> Self {
        QueueStatistics {
            posted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            high_priority: AtomicU64::new(0),
            shared_completed: AtomicU64::new(0),
            shared_errored: AtomicU64::new(0),
            num_elements: AtomicI64::new(0),
        }
    }

    pub(crate) fn inc_posted(&self) {
        self.posted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_errored(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_high_priority(&self) {
        self.high_priority.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_shared_completed(&self) {
        self.shared_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_shared_errored(&self) {
        self.shared_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_num_elements(&self) {
        self.num_elements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_num_elements(&self) {
        self.num_elements.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn sub_num_elements(&self, n: usize) {
        self.num_elements.fetch_sub(n as i64, Ordering::Relaxed);
    }

    /// Copies the counters into a plain value.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            posted: self.posted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            high_priority: self.high_priority.load(Ordering::Relaxed),
            shared_completed: self.shared_completed.load(Ordering::Relaxed),
            shared_errored: self.shared_errored.load(Ordering::Relaxed),
            num_elements: self.num_elements.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of one queue's counters.
///
/// `completed`/`errored` count tasks a worker ran from its own queue;
/// `shared_completed`/`shared_errored` count tasks it drained from the
/// shared set. `AddAssign` folds snapshots together for pool-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub posted: u64,
    pub completed: u64,
    pub errored: u64,
    pub high_priority: u64,
    pub shared_completed: u64,
    pub shared_errored: u64,
    pub num_elements: i64,
}

impl AddAssign for StatsSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.posted += other.posted;
        self.completed += other.completed;
        self.errored += other.errored;
        self.high_priority += other.high_priority;
        self.shared_completed += other.shared_completed;
        self.shared_errored += other.shared_errored;
        self.num_elements += other.num_elements;
    }
}
