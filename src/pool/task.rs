//! The unit of work consumed by the pool.
//!
//! An [`IoTask`] wraps a blocking or long-running closure producing an `i32`
//! status code, together with its routing information: the id of the worker
//! queue it targets (or [`IoTask::ANY_QUEUE`] for the shared set) and a
//! high-priority flag. A task is moved into the pool at enqueue, consumed by
//! exactly one worker, and dropped after `run` returns.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

type TaskFn = Box<dyn FnOnce() -> i32 + Send + 'static>;

pub struct IoTask {
    func: TaskFn,
    queue_id: i32,
    high_priority: bool,
}

impl IoTask {
    /// Status code for a task that completed normally.
    pub const SUCCESS: i32 = 0;
    /// Status code reported when the task body panicked.
    pub const EXCEPTION: i32 = -1;
    /// Queue id sentinel routing the task to the shared queue set.
    pub const ANY_QUEUE: i32 = -1;

    /// Creates a shared, standard-priority task.
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        IoTask {
            func: Box::new(func),
            queue_id: Self::ANY_QUEUE,
            high_priority: false,
        }
    }

    /// Targets a specific worker queue instead of the shared set.
    pub fn on_queue(mut self, queue_id: usize) -> Self {
        self.queue_id = queue_id as i32;
        self
    }

    /// Marks the task for insertion ahead of all queued standard tasks.
    pub fn high_priority(mut self) -> Self {
        self.high_priority = true;
        self
    }

    pub fn queue_id(&self) -> i32 {
        self.queue_id
    }

    pub fn is_high_priority(&self) -> bool {
        self.high_priority
    }

    /// Runs the task body, converting a panic into [`IoTask::EXCEPTION`].
    ///
    /// Panic capture is what keeps a misbehaving task from taking its worker
    /// thread down with it.
    pub fn run(self) -> i32 {
        match panic::catch_unwind(AssertUnwindSafe(self.func)) {
            Ok(rc) => rc,
            Err(_) => Self::EXCEPTION,
        }
    }
}

impl fmt::Debug for IoTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoTask")
            .field("queue_id", &self.queue_id)
            .field("high_priority", &self.high_priority)
            .finish_non_exhaustive()
    }
}
