use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct Inner<T> {
    deq: VecDeque<T>,
    closed: bool,
}

/// Bounded producer/consumer deque. Producers block while the deque is
/// full, consumers block while it is empty; `close` is sticky and wakes
/// every waiter.
pub struct BlockingDeque<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    consumer: Condvar,
    producer: Condvar,
}

impl<T> BlockingDeque<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        BlockingDeque {
            inner: Mutex::new(Inner {
                deq: VecDeque::new(),
                closed: false,
            }),
            capacity,
            consumer: Condvar::new(),
            producer: Condvar::new(),
        }
    }

    /// Blocks while full. Returns false once the deque has been closed.
    pub fn push_back(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.deq.len() >= self.capacity && !inner.closed {
            inner = self.producer.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }
        inner.deq.push_back(item);
        self.consumer.notify_one();
        true
    }

    /// Blocks while full. Returns false once the deque has been closed.
    pub fn push_front(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.deq.len() >= self.capacity && !inner.closed {
            inner = self.producer.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }
        inner.deq.push_front(item);
        self.consumer.notify_one();
        true
    }

    /// Non-blocking variant: hands the item back when full or closed.
    pub fn try_push_back(&self, item: T) -> Result<(), T> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed || inner.deq.len() >= self.capacity {
            return Err(item);
        }
        inner.deq.push_back(item);
        self.consumer.notify_one();
        Ok(())
    }

    /// Blocks while empty. Returns None once the deque has been closed.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.deq.pop_front() {
                self.producer.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.consumer.wait(inner).unwrap();
        }
    }

    /// Like `pop`, but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.deq.pop_front() {
                self.producer.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            let (guard, result) = self.consumer.wait_timeout(inner, timeout).unwrap();
            inner = guard;
            if result.timed_out() {
                return None;
            }
        }
    }

    pub fn front(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().unwrap().deq.front().cloned()
    }

    pub fn back(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().unwrap().deq.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().deq.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().deq.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().unwrap().deq.len() >= self.capacity
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().deq.clear();
    }

    /// Wakes one consumer so a drain loop can re-check its exit condition.
    pub fn flush(&self) {
        self.consumer.notify_one();
    }

    /// Clears the deque, marks it closed and wakes every waiter.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.deq.clear();
            inner.closed = true;
        }
        self.producer.notify_all();
        self.consumer.notify_all();
    }
}
