//! Task-selection policy for dedicated workers.
//!
//! A worker alternates between favoring its own queue and the shared set,
//! which gives approximate fairness with no cross-worker coordination: the
//! alternator and the shared-scan rotation below are plain per-worker state,
//! not shared atomics.

use crate::pool::task::IoTask;
use crate::pool::worker::{IoQueue, QueueCore};

pub(crate) struct WorkStealer<'a> {
    own: &'a QueueCore,
    shared: &'a [IoQueue],
    /// Flipped on every fetch to alternate own-first / shared-first.
    grab_from_shared: bool,
    /// Start offset of the next shared-set scan.
    next_shared: usize,
}

impl<'a> WorkStealer<'a> {
    pub fn new(own: &'a QueueCore, shared: &'a [IoQueue]) -> Self {
        WorkStealer {
            own,
            shared,
            grab_from_shared: false,
            next_shared: 0,
        }
    }

    /// Blocking-mode fetch: probe the primary shared queue and the own queue
    /// in alternating order, each under its own individually-held spinlock.
    /// When both come up empty, flag the own signal empty so the worker
    /// parks.
    pub fn grab_one(&mut self) -> Option<IoTask> {
        self.grab_from_shared = !self.grab_from_shared;
        let idle = &self.own.idle;
        let primary = self.shared.first();

        let task = if self.grab_from_shared {
            primary
                .and_then(|queue| queue.core().dequeue(idle))
                .or_else(|| self.own.dequeue(idle))
        } else {
            self.own
                .dequeue(idle)
                .or_else(|| primary.and_then(|queue| queue.core().dequeue(idle)))
        };

        if task.is_none() {
            self.own.signal.set_empty(true);
        }
        task
    }

    /// Load-balanced fetch: one branch scans the whole shared set first,
    /// the other starts with the own queue.
    pub fn grab_one_from_any(&mut self) -> Option<IoTask> {
        self.grab_from_shared = !self.grab_from_shared;
        let idle = &self.own.idle;
        if self.grab_from_shared {
            self.try_dequeue_from_shared()
                .or_else(|| self.own.dequeue(idle))
        } else {
            self.own
                .dequeue(idle)
                .or_else(|| self.try_dequeue_from_shared())
        }
    }

    /// Scans the shared set with `try_dequeue`, starting after the rotation
    /// point of the previous scan.
    ///
    /// Workers never block on each other's queues here; when every attempt
    /// lost its `try_lock` but the sizes seen during the scan were non-zero,
    /// tasks exist and the scan repeats rather than letting the worker drift
    /// into a backoff sleep over a non-empty set.
    fn try_dequeue_from_shared(&mut self) -> Option<IoTask> {
        if self.shared.is_empty() {
            return None;
        }
        loop {
            let mut seen = 0;
            for _ in 0..self.shared.len() {
                self.next_shared = (self.next_shared + 1) % self.shared.len();
                let queue = &self.shared[self.next_shared];
                seen += queue.core().size();
                if let Some(task) = queue.core().try_dequeue(&self.own.idle) {
                    return Some(task);
                }
            }
            if seen == 0 {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use std::thread;
    use std::time::Duration;

    fn config() -> PoolConfig {
        PoolConfig {
            load_balance_shared_queues: true,
            poll_interval_ms: 1,
            backoff_policy: Default::default(),
            num_backoffs: 0,
        }
    }

    fn task(tag: i32) -> IoTask {
        IoTask::new(move || tag)
    }

    #[test]
    fn grab_one_alternates_between_shared_and_own() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        let shared = vec![IoQueue::shared_only(&cfg)];
        own.enqueue(task(1).on_queue(0));
        shared[0].core().enqueue(task(2));

        let mut stealer = WorkStealer::new(&own, &shared);
        // First fetch favors the shared side, the next the own queue.
        assert_eq!(stealer.grab_one().map(IoTask::run), Some(2));
        own.enqueue(task(3).on_queue(0));
        shared[0].core().enqueue(task(4));
        assert_eq!(stealer.grab_one().map(IoTask::run), Some(3));
    }

    #[test]
    fn grab_one_flags_empty_when_both_queues_are_drained() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        let shared = vec![IoQueue::shared_only(&cfg)];
        let mut stealer = WorkStealer::new(&own, &shared);

        own.signal.set_empty(false);
        assert!(stealer.grab_one().is_none());
        assert!(own.signal.is_empty());
    }

    #[test]
    fn grab_one_only_consults_the_primary_shared_queue() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        let shared = vec![IoQueue::shared_only(&cfg), IoQueue::shared_only(&cfg)];
        shared[1].core().enqueue(task(9));

        let mut stealer = WorkStealer::new(&own, &shared);
        assert!(stealer.grab_one().is_none());
        assert!(stealer.grab_one().is_none());
        assert_eq!(shared[1].size(), 1);
    }

    #[test]
    fn grab_one_works_without_shared_queues() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        own.enqueue(task(5).on_queue(0));

        let mut stealer = WorkStealer::new(&own, &[]);
        assert_eq!(stealer.grab_one().map(IoTask::run), Some(5));
        assert!(stealer.grab_one().is_none());
    }

    #[test]
    fn shared_scan_rotates_across_queues() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        let shared: Vec<_> = (0..3).map(|_| IoQueue::shared_only(&cfg)).collect();
        for (i, queue) in shared.iter().enumerate() {
            queue.core().enqueue(task(i as i32));
        }

        let mut stealer = WorkStealer::new(&own, &shared);
        let mut tags = Vec::new();
        while let Some(task) = stealer.grab_one_from_any() {
            tags.push(task.run());
        }
        tags.sort_unstable();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn contended_scan_retries_until_the_task_is_won() {
        let cfg = config();
        let own = QueueCore::new(cfg.load_balance_shared_queues);
        let shared = vec![IoQueue::shared_only(&cfg)];
        shared[0].core().enqueue(task(7));

        thread::scope(|scope| {
            scope.spawn(|| {
                let guard = shared[0].core().queue.acquire_for_contention();
                thread::sleep(Duration::from_millis(100));
                drop(guard);
            });
            thread::sleep(Duration::from_millis(10));

            // The lock is held but the queue is non-empty; the scan must
            // keep retrying instead of reporting an empty set.
            let mut stealer = WorkStealer::new(&own, &shared);
            let grabbed = stealer.grab_one_from_any();
            assert_eq!(grabbed.map(IoTask::run), Some(7));
        });
    }
}
