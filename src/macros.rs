//! Convenience macros for building pools and tasks.

/// Builds an [`IoTask`](crate::IoTask) from a closure, with optional routing.
///
/// # Examples
/// ```rust
/// use iopool::{io_task, IoPoolBuilder};
///
/// let pool = IoPoolBuilder::new().num_threads(2).build();
///
/// // Shared, standard priority.
/// pool.post(io_task!(|| 0)).unwrap();
///
/// // Pinned to worker queue 1, high priority.
/// pool.post(io_task!(|| 0, queue: 1, high_priority)).unwrap();
///
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! io_task {
    ($f:expr) => {
        $crate::IoTask::new($f)
    };
    ($f:expr, queue: $queue:expr) => {
        $crate::IoTask::new($f).on_queue($queue)
    };
    ($f:expr, high_priority) => {
        $crate::IoTask::new($f).high_priority()
    };
    ($f:expr, queue: $queue:expr, high_priority) => {
        $crate::IoTask::new($f).on_queue($queue).high_priority()
    };
}

/// Builds an [`IoPool`](crate::IoPool) with common configurations.
///
/// # Examples
/// ```rust
/// use iopool::create_io_pool;
///
/// let pool = create_io_pool!(num_threads: 2, load_balance: true);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! create_io_pool {
    (num_threads: $n:expr) => {
        $crate::IoPoolBuilder::new().num_threads($n).build()
    };
    (num_threads: $n:expr, load_balance: $lb:expr) => {
        $crate::IoPoolBuilder::new()
            .num_threads($n)
            .load_balance_shared_queues($lb)
            .build()
    };
    (num_threads: $n:expr, num_shared_queues: $s:expr) => {
        $crate::IoPoolBuilder::new()
            .num_threads($n)
            .num_shared_queues($s)
            .build()
    };
    (num_threads: $n:expr, num_shared_queues: $s:expr, load_balance: $lb:expr) => {
        $crate::IoPoolBuilder::new()
            .num_threads($n)
            .num_shared_queues($s)
            .load_balance_shared_queues($lb)
            .build()
    };
}

/// Prints the pool-wide counter totals.
///
/// # Examples
/// ```rust
/// use iopool::{log_stats, IoPoolBuilder};
///
/// let pool = IoPoolBuilder::new().build();
/// log_stats!(pool);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! log_stats {
    ($pool:expr) => {{
        let stats = $pool.stats();
        println!("posted: {}", stats.posted);
        println!("completed: {}", stats.completed);
        println!("errored: {}", stats.errored);
        println!("high priority: {}", stats.high_priority);
        println!("shared completed: {}", stats.shared_completed);
        println!("shared errored: {}", stats.shared_errored);
        println!("queued elements: {}", stats.num_elements);
    }};
}
