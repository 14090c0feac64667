//! Spinlock-protected FIFO of pending tasks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::pool::task::IoTask;
use crate::sync::SpinLock;

/// A single queue of pending tasks.
///
/// Standard tasks append at the back; high-priority tasks insert behind the
/// queued high-priority prefix, so both classes stay FIFO among themselves
/// while every high-priority task dequeues before every queued standard one.
///
/// `len` mirrors the deque length and is maintained under the spinlock, so
/// readers that must not block (the stealer's size scan, the EmptySignal
/// ground-truth re-check) can observe the population lock-free.
pub(crate) struct TaskQueue {
    tasks: SpinLock<VecDeque<IoTask>>,
    len: AtomicUsize,
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue {
            tasks: SpinLock::new(VecDeque::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Inserts a task, returning whether the queue was empty beforehand
    /// (the caller signals its worker on the 0 -> 1 transition).
    pub fn enqueue(&self, task: IoTask) -> bool {
        let mut tasks = self.tasks.lock();
        let was_empty = tasks.is_empty();
        Self::insert(&mut tasks, task);
        self.len.store(tasks.len(), Ordering::Release);
        was_empty
    }

    /// Non-blocking [`TaskQueue::enqueue`]; hands the task back untouched if
    /// the spinlock is contended.
    pub fn try_enqueue(&self, task: IoTask) -> Result<bool, IoTask> {
        match self.tasks.try_lock() {
            Some(mut tasks) => {
                let was_empty = tasks.is_empty();
                Self::insert(&mut tasks, task);
                self.len.store(tasks.len(), Ordering::Release);
                Ok(was_empty)
            }
            None => Err(task),
        }
    }

    /// Pops the front task. `idle` is set to whether the caller came away
    /// empty-handed: a popped task is about to execute on the caller's
    /// thread, so the caller is not idle until it finishes.
    pub fn dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        let mut tasks = self.tasks.lock();
        let task = tasks.pop_front();
        self.len.store(tasks.len(), Ordering::Release);
        idle.store(task.is_none(), Ordering::Release);
        task
    }

    /// Non-blocking [`TaskQueue::dequeue`]; on spinlock contention returns
    /// `None` and leaves `idle` untouched.
    pub fn try_dequeue(&self, idle: &AtomicBool) -> Option<IoTask> {
        let mut tasks = self.tasks.try_lock()?;
        let task = tasks.pop_front();
        self.len.store(tasks.len(), Ordering::Release);
        idle.store(task.is_none(), Ordering::Release);
        task
    }

    /// Drops every queued task, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let drained = tasks.len();
        tasks.clear();
        self.len.store(0, Ordering::Release);
        drained
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grabs the spinlock so tests can stage contention.
    #[cfg(test)]
    pub(crate) fn acquire_for_contention(
        &self,
    ) -> crate::sync::SpinLockGuard<'_, VecDeque<IoTask>> {
        self.tasks.lock()
    }

    fn insert(tasks: &mut VecDeque<IoTask>, task: IoTask) {
        if task.is_high_priority() {
            let prefix = tasks.iter().take_while(|t| t.is_high_priority()).count();
            tasks.insert(prefix, task);
        } else {
            tasks.push_back(task);
        }
    }
}
