use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    tasks: VecDeque<Task>,
    closed: bool,
}

/// Fixed-size worker pool over a shared FIFO task queue. Workers drain
/// the queue before checking the closed flag, so every queued task runs
/// exactly once even during teardown.
pub struct ThreadPool {
    shared: Arc<(Mutex<PoolState>, Condvar)>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(thread_count: usize) -> Self {
        assert!(thread_count > 0);
        let shared = Arc::new((
            Mutex::new(PoolState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            Condvar::new(),
        ));
        let mut workers = Vec::with_capacity(thread_count);
        for i in 0..thread_count {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || {
                    let (lock, cond) = &*shared;
                    let mut state = lock.lock().unwrap();
                    loop {
                        if let Some(task) = state.tasks.pop_front() {
                            drop(state);
                            task();
                            state = lock.lock().unwrap();
                        } else if state.closed {
                            break;
                        } else {
                            state = cond.wait(state).unwrap();
                        }
                    }
                })
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        ThreadPool { shared, workers }
    }

    pub fn add_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let (lock, cond) = &*self.shared;
        lock.lock().unwrap().tasks.push_back(Box::new(task));
        cond.notify_one();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let (lock, cond) = &*self.shared;
        lock.lock().unwrap().closed = true;
        cond.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
