use iopool::{IoPoolBuilder, IoTask};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
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

/// Posts a task that parks the single worker until the returned sender
/// fires, so follow-up posts queue up deterministically behind it.
fn park_worker(pool: &iopool::IoPool) -> mpsc::Sender<()> {
    let (release, gate) = mpsc::channel::<()>();
    let started = Arc::new(AtomicBool::new(false));
    let task_started = Arc::clone(&started);
    pool.post(
        IoTask::new(move || {
            task_started.store(true, Ordering::SeqCst);
            gate.recv().unwrap();
            0
        })
        .on_queue(0),
    )
    .unwrap();
    assert!(wait_until(5_000, || started.load(Ordering::SeqCst)));
    release
}

fn record(order: &Arc<Mutex<Vec<&'static str>>>, done: &Arc<AtomicUsize>, tag: &'static str) -> IoTask {
    let order = Arc::clone(order);
    let done = Arc::clone(done);
    IoTask::new(move || {
        order.lock().unwrap().push(tag);
        done.fetch_add(1, Ordering::SeqCst);
        0
    })
    .on_queue(0)
}

#[test]
fn test_high_priority_runs_before_queued_standard_tasks() {
    let pool = IoPoolBuilder::new().num_threads(1).build();
    let order = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(AtomicUsize::new(0));

    let release = park_worker(&pool);
    pool.post(record(&order, &done, "T1")).unwrap();
    pool.post(record(&order, &done, "T2")).unwrap();
    pool.post(record(&order, &done, "T3").high_priority()).unwrap();
    release.send(()).unwrap();

    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 3));
    assert_eq!(*order.lock().unwrap(), vec!["T3", "T1", "T2"]);

    // The gate task is the fourth post on this queue.
    let stats = pool.worker_queue(0).unwrap().stats();
    assert_eq!(stats.posted, 4);
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.high_priority, 1);
    pool.shutdown();
}

#[test]
fn test_same_priority_tasks_are_fifo() {
    let pool = IoPoolBuilder::new().num_threads(1).build();
    let order = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(AtomicUsize::new(0));

    let release = park_worker(&pool);
    for tag in ["A", "B", "C"] {
        pool.post(record(&order, &done, tag)).unwrap();
    }
    release.send(()).unwrap();

    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 3));
    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    pool.shutdown();
}

#[test]
fn test_high_priority_tasks_are_fifo_among_themselves() {
    let pool = IoPoolBuilder::new().num_threads(1).build();
    let order = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(AtomicUsize::new(0));

    let release = park_worker(&pool);
    pool.post(record(&order, &done, "S1")).unwrap();
    pool.post(record(&order, &done, "H1").high_priority()).unwrap();
    pool.post(record(&order, &done, "H2").high_priority()).unwrap();
    release.send(()).unwrap();

    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 3));
    assert_eq!(*order.lock().unwrap(), vec!["H1", "H2", "S1"]);
    pool.shutdown();
}
