//! Worker queues and the worker thread loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use super::task::IoTask;
use super::PoolConfig;
use crate::backoff::BackoffTimer;
use crate::errors::EnqueueError;
use crate::metrics::{QueueStatistics, StatsSnapshot};
use crate::queue::TaskQueue;
use crate::stealer::WorkStealer;
use crate::sync::EmptySignal;

/// Queue state shared between producers and the worker thread.
pub(crate) struct QueueCore {
    pub(crate) queue: TaskQueue,
    pub(crate) signal: EmptySignal,
    pub(crate) stats: QueueStatistics,
    /// True iff no task is currently executing on this worker's thread.
    pub(crate) idle: AtomicBool,
    pub(crate) interrupted: AtomicBool,
    load_balance: bool,
}

impl QueueCore {
    pub(crate) fn new(load_balance: bool) -> Self {
        QueueCore {
            queue: TaskQueue::new(),
            signal: EmptySignal::new(),
            stats: QueueStatistics::new(),
            idle: AtomicBool::new(true),
            interrupted: AtomicBool::new(false),
            load_balance,
        }
    }

    /// Inserts a task and wakes the owning worker on the 0 -> 1 transition
    /// (blocking mode only; polling workers discover work on their own).
    pub(crate) fn enqueue(&self, task: IoTask) -> bool {
        if task.is_high_priority() {
            self.stats.inc_high_priority();
        }
        let was_empty = self.queue.enqueue(task);
        self.stats.inc_posted();
        self.stats.inc_num_elements();
        if !self.load_balance && was_empty {
            self.signal.set_empty(false);
        }
        was_empty
    }

    pub(crate) fn try_enqueue(&self, task: IoTask) -> Result<bool, IoTask> {
        let high = task.is_high_priority();
        let was_empty = self.queue.try_enqueue(task)?;
        if high {
            self.stats.inc_high_priority();
        }
        self.stats.inc_posted();
        self.stats.inc_num_elements();
        if !self.load_balance && was_empty {
            self.signal.set_empty(false);
        }
        Ok(was_empty)
    }

    pub(crate) fn dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        let task = self.queue.dequeue(idle);
        if task.is_some() {
            self.stats.dec_num_elements();
        }
        task
    }

    pub(crate) fn try_dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        let task = self.queue.try_dequeue(idle)?;
        self.stats.dec_num_elements();
        Some(task)
    }

    /// Queued tasks plus the one in flight, if any.
    pub(crate) fn size(&self) -> usize {
        let len = self.queue.len();
        if self.idle.load(Ordering::Acquire) {
            len
        } else {
            len + 1
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.idle.load(Ordering::Acquire)
    }

    fn clear(&self) {
        let drained = self.queue.clear();
        self.stats.sub_num_elements(drained);
    }
}

/// A single queue of the pool: either a dedicated worker (queue + thread)
/// or a shared queue (no thread, drained by the dedicated workers).
///
/// Construction goes through the pool builder; there is deliberately no way
/// to copy a live worker.
pub struct IoQueue {
    core: Arc<QueueCore>,
    thread: Mutex<Option<JoinHandle<()>>>,
    terminated: AtomicBool,
}

impl IoQueue {
    pub(crate) fn shared_only(config: &PoolConfig) -> Self {
        IoQueue {
            core: Arc::new(QueueCore::new(config.load_balance_shared_queues)),
            thread: Mutex::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn dedicated(
        config: &PoolConfig,
        shared: Arc<Vec<IoQueue>>,
        index: usize,
    ) -> Self {
        let core = Arc::new(QueueCore::new(config.load_balance_shared_queues));
        let thread = {
            let core = Arc::clone(&core);
            let shared = Arc::clone(&shared);
            let config = config.clone();
            thread::Builder::new()
                .name(format!("io-worker-{index}"))
                .spawn(move || worker_loop(&core, &shared, &config))
                .expect("failed to spawn io worker thread")
        };
        IoQueue {
            core,
            thread: Mutex::new(Some(thread)),
            terminated: AtomicBool::new(false),
        }
    }

    /// Inserts a task, returning whether the queue was empty beforehand.
    ///
    /// The task is handed back inside [`EnqueueError::Terminated`] once
    /// [`IoQueue::terminate`] has run.
    pub fn enqueue(&self, task: IoTask) -> Result<bool, EnqueueError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(EnqueueError::Terminated(task));
        }
        Ok(self.core.enqueue(task))
    }

    /// Non-blocking [`IoQueue::enqueue`]; on spinlock contention the task
    /// comes back inside [`EnqueueError::Contended`].
    pub fn try_enqueue(&self, task: IoTask) -> Result<bool, EnqueueError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(EnqueueError::Terminated(task));
        }
        self.core.try_enqueue(task).map_err(EnqueueError::Contended)
    }

    /// Pops the front task, recording in `idle` whether the caller came away
    /// empty-handed. `idle` belongs to the executing worker, not to this
    /// queue, so stealing from a shared queue attributes the in-flight task
    /// to the thread that runs it.
    pub fn dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        self.core.dequeue(idle)
    }

    /// Non-blocking [`IoQueue::dequeue`].
    pub fn try_dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        self.core.try_dequeue(idle)
    }

    /// Queued tasks plus the in-flight one, if any.
    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.core.idle.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Stops the worker and discards queued tasks. Idempotent.
    ///
    /// A dedicated worker is interrupted, woken if it is parked, and joined
    /// before its queue is cleared, so a task that already started runs to
    /// completion. A shared queue has no thread; its queue is simply
    /// cleared.
    pub fn terminate(&self) {
        if self
            .terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let handle = self.thread.lock().unwrap().take();
        match handle {
            Some(handle) => {
                self.core.signal.interrupt(&self.core.interrupted);
                if !self.core.load_balance {
                    self.core.signal.notify_all();
                }
                let _ = handle.join();
                self.core.clear();
            }
            None => self.core.clear(),
        }
    }

    pub(crate) fn core(&self) -> &QueueCore {
        &self.core
    }

    /// Wakes the worker so it re-scans its queues; used by the pool when a
    /// task lands in the shared set that this worker's own signal never
    /// hears about.
    pub(crate) fn wake(&self) {
        self.core.signal.set_empty(false);
    }
}

impl Drop for IoQueue {
    fn drop(&mut self) {
        self.terminate();
    }
}

pub(crate) fn worker_loop(core: &QueueCore, shared: &[IoQueue], config: &PoolConfig) {
    trace!("io worker started");
    let mut stealer = WorkStealer::new(core, shared);
    let mut backoff = BackoffTimer::new(
        config.poll_interval_ms,
        config.backoff_policy,
        config.num_backoffs,
    );

    loop {
        let mut task = None;
        if config.load_balance_shared_queues {
            while !core.interrupted.load(Ordering::Acquire) {
                task = stealer.grab_one_from_any();
                if task.is_some() {
                    backoff.reset();
                    break;
                }
                thread::sleep(backoff.next_interval());
            }
        } else if core.signal.is_empty() {
            let primary = shared.first();
            core.signal.wait_while_empty(&core.interrupted, || {
                core.queue.is_empty() && primary.map_or(true, |q| q.core().queue.is_empty())
            });
        }

        if core.interrupted.load(Ordering::Acquire) {
            break;
        }

        if !config.load_balance_shared_queues {
            task = stealer.grab_one();
        }
        // A wake can race with another consumer emptying the queues;
        // re-evaluate from the top.
        let Some(task) = task else { continue };

        let from_shared = task.queue_id() == IoTask::ANY_QUEUE;
        core.idle.store(false, Ordering::Release);
        let rc = task.run();
        core.idle.store(true, Ordering::Release);

        if rc == IoTask::SUCCESS {
            if from_shared {
                core.stats.inc_shared_completed();
            } else {
                core.stats.inc_completed();
            }
        } else {
            if from_shared {
                core.stats.inc_shared_errored();
            } else {
                core.stats.inc_errored();
            }
            if rc == IoTask::EXCEPTION {
                debug!("io task panicked");
            } else {
                debug!(rc, "io task returned an error status");
            }
        }
    }
    trace!("io worker stopped");
}
