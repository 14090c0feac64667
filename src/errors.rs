//! Error types for task submission.

use crate::pool::task::IoTask;

/// Why a task could not be enqueued. Every variant hands the rejected task
/// back so the caller can retry or reroute it.
#[derive(Debug)]
pub enum EnqueueError {
    /// The target queue (or the whole pool) has been terminated.
    Terminated(IoTask),
    /// The task names a worker queue the pool does not have.
    InvalidQueueId(IoTask),
    /// The queue spinlock was contended; only returned by the `try_`
    /// variants.
    Contended(IoTask),
}

impl EnqueueError {
    /// Recovers the rejected task.
    pub fn into_task(self) -> IoTask {
        match self {
            EnqueueError::Terminated(task)
            | EnqueueError::InvalidQueueId(task)
            | EnqueueError::Contended(task) => task,
        }
    }
}

impl std::fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnqueueError::Terminated(_) => write!(f, "queue is terminated"),
            EnqueueError::InvalidQueueId(task) => {
                write!(f, "no worker queue with id {}", task.queue_id())
            }
            EnqueueError::Contended(_) => write!(f, "queue lock is contended"),
        }
    }
}

impl std::error::Error for EnqueueError {}
