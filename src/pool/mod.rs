pub mod task;
pub mod worker;

use std::sync::Arc;

use crate::backoff::BackoffPolicy;
use crate::errors::EnqueueError;
use crate::metrics::StatsSnapshot;
use task::IoTask;
use worker::IoQueue;

#[derive(Clone, Debug)]
pub(crate) struct PoolConfig {
    pub(crate) load_balance_shared_queues: bool,
    pub(crate) poll_interval_ms: u64,
    pub(crate) backoff_policy: BackoffPolicy,
    pub(crate) num_backoffs: u32,
}

/// A pool of dedicated worker queues plus a set of shared queues drained
/// cooperatively by the workers.
///
/// Two selection policies exist, chosen at build time. In the default
/// blocking mode each worker alternates between its own queue and the
/// primary shared queue and parks on a condition variable when both are
/// empty. In load-balanced mode every fetch scans the entire shared set
/// with `try_lock` probes and the worker sleeps on a backoff ramp instead
/// of blocking.
pub struct IoPool {
    // Dropped before `shared`: terminating a dedicated worker joins its
    // thread, which releases that thread's reference to the shared set.
    dedicated: Vec<IoQueue>,
    shared: Arc<Vec<IoQueue>>,
    config: PoolConfig,
}

impl IoPool {
    pub fn builder() -> IoPoolBuilder {
        IoPoolBuilder::new()
    }

    /// Routes a task to the queue named by its `queue_id`, or into the
    /// shared set for [`IoTask::ANY_QUEUE`].
    ///
    /// Shared submissions go to the least-loaded shared queue in
    /// load-balanced mode and to the primary shared queue otherwise. In
    /// blocking mode a 0 -> 1 shared insert also wakes the dedicated
    /// workers, whose own conditions never hear about shared activity.
    pub fn post(&self, task: IoTask) -> Result<(), EnqueueError> {
        let id = task.queue_id();
        if id == IoTask::ANY_QUEUE {
            return self.post_to_shared(task);
        }
        let Ok(index) = usize::try_from(id) else {
            return Err(EnqueueError::InvalidQueueId(task));
        };
        match self.dedicated.get(index) {
            Some(queue) => queue.enqueue(task).map(drop),
            None => Err(EnqueueError::InvalidQueueId(task)),
        }
    }

    /// Non-blocking [`IoPool::post`].
    pub fn try_post(&self, task: IoTask) -> Result<(), EnqueueError> {
        let id = task.queue_id();
        if id == IoTask::ANY_QUEUE {
            let queue = self.pick_shared();
            let was_empty = queue.try_enqueue(task)?;
            if !self.config.load_balance_shared_queues && was_empty {
                self.wake_workers();
            }
            return Ok(());
        }
        let Ok(index) = usize::try_from(id) else {
            return Err(EnqueueError::InvalidQueueId(task));
        };
        match self.dedicated.get(index) {
            Some(queue) => queue.try_enqueue(task).map(drop),
            None => Err(EnqueueError::InvalidQueueId(task)),
        }
    }

    fn post_to_shared(&self, task: IoTask) -> Result<(), EnqueueError> {
        let queue = self.pick_shared();
        let was_empty = queue.enqueue(task)?;
        if !self.config.load_balance_shared_queues && was_empty {
            self.wake_workers();
        }
        Ok(())
    }

    fn pick_shared(&self) -> &IoQueue {
        if self.config.load_balance_shared_queues {
            self.shared
                .iter()
                .min_by_key(|queue| queue.size())
                .expect("pool always owns at least one shared queue")
        } else {
            // Blocking-mode workers only ever consult the primary shared
            // queue, so everything routed to the shared set lands there.
            &self.shared[0]
        }
    }

    fn wake_workers(&self) {
        for worker in &self.dedicated {
            worker.wake();
        }
    }

    pub fn num_workers(&self) -> usize {
        self.dedicated.len()
    }

    pub fn num_shared_queues(&self) -> usize {
        self.shared.len()
    }

    pub fn worker_queue(&self, index: usize) -> Option<&IoQueue> {
        self.dedicated.get(index)
    }

    pub fn shared_queue(&self, index: usize) -> Option<&IoQueue> {
        self.shared.get(index)
    }

    /// Counter totals folded across every queue of the pool.
    pub fn stats(&self) -> StatsSnapshot {
        let mut total = StatsSnapshot::default();
        for queue in self.dedicated.iter().chain(self.shared.iter()) {
            total += queue.stats();
        }
        total
    }

    /// Queued plus in-flight tasks across the pool.
    pub fn size(&self) -> usize {
        self.dedicated
            .iter()
            .chain(self.shared.iter())
            .map(IoQueue::size)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dedicated
            .iter()
            .chain(self.shared.iter())
            .all(IoQueue::is_empty)
    }

    /// Terminates every queue: dedicated workers are interrupted and joined
    /// first, then the shared queues are cleared. Pending tasks are
    /// discarded; tasks already executing finish first.
    pub fn shutdown(self) {
        for worker in &self.dedicated {
            worker.terminate();
        }
        for queue in self.shared.iter() {
            queue.terminate();
        }
    }
}

impl Drop for IoPool {
    fn drop(&mut self) {
        // terminate() is idempotent, so an explicit shutdown() followed by
        // this drop is fine.
        for worker in &self.dedicated {
            worker.terminate();
        }
        for queue in self.shared.iter() {
            queue.terminate();
        }
    }
}

/// Builder for [`IoPool`].
pub struct IoPoolBuilder {
    num_threads: usize,
    num_shared_queues: usize,
    load_balance_shared_queues: bool,
    poll_interval_ms: u64,
    backoff_policy: BackoffPolicy,
    num_backoffs: u32,
}

impl IoPoolBuilder {
    pub fn new() -> Self {
        IoPoolBuilder {
            num_threads: 4,
            num_shared_queues: 1,
            load_balance_shared_queues: false,
            poll_interval_ms: 10,
            backoff_policy: BackoffPolicy::Linear,
            num_backoffs: 0,
        }
    }

    /// Number of dedicated worker threads (at least 1).
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    /// Number of shared queues (at least 1).
    pub fn num_shared_queues(mut self, n: usize) -> Self {
        self.num_shared_queues = n;
        self
    }

    /// Switches workers from the blocking policy to polling the entire
    /// shared set on every fetch.
    pub fn load_balance_shared_queues(mut self, enable: bool) -> Self {
        self.load_balance_shared_queues = enable;
        self
    }

    /// Base polling interval for load-balanced workers, in milliseconds
    /// (at least 1).
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn backoff_policy(mut self, policy: BackoffPolicy) -> Self {
        self.backoff_policy = policy;
        self
    }

    /// Number of backoff steps before the polling interval stops growing.
    pub fn num_backoffs(mut self, n: u32) -> Self {
        self.num_backoffs = n;
        self
    }

    pub fn build(self) -> IoPool {
        let config = PoolConfig {
            load_balance_shared_queues: self.load_balance_shared_queues,
            poll_interval_ms: self.poll_interval_ms.max(1),
            backoff_policy: self.backoff_policy,
            num_backoffs: self.num_backoffs,
        };

        let shared: Arc<Vec<IoQueue>> = Arc::new(
            (0..self.num_shared_queues.max(1))
                .map(|_| IoQueue::shared_only(&config))
                .collect(),
        );

        let dedicated = (0..self.num_threads.max(1))
            .map(|index| IoQueue::dedicated(&config, Arc::clone(&shared), index))
            .collect();

        IoPool {
            dedicated,
            shared,
            config,
        }
    }
}

impl Default for IoPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
