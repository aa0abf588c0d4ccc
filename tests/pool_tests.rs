use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use web_server::pool::ThreadPool;

#[test]
fn test_every_task_runs_exactly_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::new(4);
        for _ in 0..200 {
            let counter = Arc::clone(&counter);
            pool.add_task(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
        // Drop joins the workers after the queue has drained.
    }
    assert_eq!(counter.load(Ordering::Relaxed), 200);
}

#[test]
fn test_single_worker_preserves_fifo_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let pool = ThreadPool::new(1);
        for i in 0..50 {
            let order = Arc::clone(&order);
            pool.add_task(move || order.lock().unwrap().push(i));
        }
    }
    let order = order.lock().unwrap();
    assert_eq!(*order, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_workers_run_in_parallel() {
    // Both tasks meet at the barrier, which needs two live workers.
    let barrier = Arc::new(Barrier::new(2));
    let pool = ThreadPool::new(2);
    for _ in 0..2 {
        let barrier = Arc::clone(&barrier);
        pool.add_task(move || {
            barrier.wait();
        });
    }
    drop(pool);
}
