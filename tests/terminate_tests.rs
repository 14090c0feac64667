use iopool::{EnqueueError, IoPoolBuilder, IoTask};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(timeout_ms: u64, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn test_terminate_while_the_worker_is_parked() {
    let pool = IoPoolBuilder::new().num_threads(1).build();
    // Give the worker time to park on its empty condition.
    thread::sleep(Duration::from_millis(50));

    let queue = pool.worker_queue(0).unwrap();
    queue.terminate();

    // terminate() returned, so the thread is joined and the queue drained.
    assert!(queue.is_empty());
    assert_eq!(queue.size(), 0);

    match queue.enqueue(IoTask::new(|| 0).on_queue(0)) {
        Err(EnqueueError::Terminated(task)) => assert_eq!(task.queue_id(), 0),
        other => panic!("expected a terminated rejection, got {other:?}"),
    }
    pool.shutdown();
}

#[test]
fn test_terminate_from_another_thread() {
    let pool = Arc::new(IoPoolBuilder::new().num_threads(1).build());
    thread::sleep(Duration::from_millis(50));

    let terminator = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.worker_queue(0).unwrap().terminate())
    };
    terminator.join().unwrap();

    assert!(pool.worker_queue(0).unwrap().enqueue(IoTask::new(|| 0)).is_err());
}

#[test]
fn test_terminate_is_idempotent() {
    let pool = IoPoolBuilder::new().num_threads(2).build();
    let done = Arc::new(AtomicUsize::new(0));

    let task_done = Arc::clone(&done);
    pool.post(
        IoTask::new(move || {
            task_done.fetch_add(1, Ordering::SeqCst);
            0
        })
        .on_queue(0),
    )
    .unwrap();
    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 1));

    let queue = pool.worker_queue(0).unwrap();
    for _ in 0..3 {
        queue.terminate();
    }
    assert!(queue.is_empty());

    // shutdown() terminates queue 0 a fourth time; still a no-op.
    pool.shutdown();
}

#[test]
fn test_terminating_a_drained_pool_keeps_completed_work() {
    let pool = IoPoolBuilder::new().num_threads(2).build();
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..6 {
        let done = Arc::clone(&done);
        pool.post(IoTask::new(move || {
            done.fetch_add(1, Ordering::SeqCst);
            0
        }))
        .unwrap();
    }
    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 6));
    assert!(wait_until(5_000, || pool.stats().shared_completed == 6));

    pool.shutdown();
    assert_eq!(done.load(Ordering::SeqCst), 6);
}

#[test]
fn test_undrained_shared_queue_is_cleared_on_terminate() {
    // In blocking mode only the primary shared queue is consulted, so a
    // task placed directly on a secondary shared queue sits there until
    // that queue is terminated.
    let pool = IoPoolBuilder::new()
        .num_threads(1)
        .num_shared_queues(2)
        .build();

    let secondary = pool.shared_queue(1).unwrap();
    secondary.enqueue(IoTask::new(|| 0)).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(secondary.size(), 1);

    secondary.terminate();
    assert_eq!(secondary.size(), 0);
    assert!(secondary.is_empty());
    pool.shutdown();
}
