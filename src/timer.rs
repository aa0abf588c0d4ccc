use std::collections::HashMap;
use std::time::{Duration, Instant};

use mio::Token;

struct TimerNode {
    id: Token,
    expires: Instant,
}

/// Indexed binary min-heap of per-connection deadlines. The `ref_map`
/// tracks every node's heap position so deadlines can be updated or
/// removed by connection id in O(log n).
///
/// The reactor owns the heap and performs the close itself when
/// [`TimerHeap::tick`] hands back a due id; nodes carry no callback.
pub struct TimerHeap {
    heap: Vec<TimerNode>,
    ref_map: HashMap<Token, usize>,
}

impl TimerHeap {
    pub fn new() -> Self {
        TimerHeap {
            heap: Vec::with_capacity(64),
            ref_map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: Token) -> bool {
        self.ref_map.contains_key(&id)
    }

    /// Adds `id` with the given deadline, or reschedules it when already
    /// present.
    pub fn add(&mut self, id: Token, timeout: Duration) {
        match self.ref_map.get(&id).copied() {
            None => {
                let i = self.heap.len();
                self.ref_map.insert(id, i);
                self.heap.push(TimerNode {
                    id,
                    expires: Instant::now() + timeout,
                });
                self.sift_up(i);
            }
            Some(i) => {
                self.heap[i].expires = Instant::now() + timeout;
                if !self.sift_down(i, self.heap.len()) {
                    self.sift_up(i);
                }
            }
        }
    }

    /// Pushes an existing node's deadline out to `now + timeout`.
    pub fn adjust(&mut self, id: Token, timeout: Duration) {
        assert!(!self.heap.is_empty() && self.ref_map.contains_key(&id));
        let i = self.ref_map[&id];
        self.heap[i].expires = Instant::now() + timeout;
        if !self.sift_down(i, self.heap.len()) {
            self.sift_up(i);
        }
    }

    pub fn remove(&mut self, id: Token) {
        if let Some(&i) = self.ref_map.get(&id) {
            self.del(i);
        }
    }

    /// Pops every due node and returns their ids in deadline order.
    pub fn tick(&mut self) -> Vec<Token> {
        let mut due = Vec::new();
        let now = Instant::now();
        while let Some(top) = self.heap.first() {
            if top.expires > now {
                break;
            }
            due.push(top.id);
            self.pop();
        }
        due
    }

    /// Delay until the earliest deadline, clamped at zero; `None` when the
    /// heap is empty.
    pub fn next_timeout(&self) -> Option<Duration> {
        let now = Instant::now();
        self.heap
            .first()
            .map(|node| node.expires.saturating_duration_since(now))
    }

    pub fn pop(&mut self) {
        assert!(!self.heap.is_empty());
        self.del(0);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.ref_map.clear();
    }

    /// Swap the node to the tail, re-heapify the displaced node, drop the
    /// tail.
    fn del(&mut self, index: usize) {
        assert!(!self.heap.is_empty() && index < self.heap.len());
        let last = self.heap.len() - 1;
        if index < last {
            self.swap(index, last);
            if !self.sift_down(index, last) {
                self.sift_up(index);
            }
        }
        if let Some(node) = self.heap.pop() {
            self.ref_map.remove(&node.id);
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.ref_map.insert(self.heap[i].id, i);
        self.ref_map.insert(self.heap[j].id, j);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[parent].expires <= self.heap[i].expires {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    /// Returns true when the node moved, meaning no sift-up is needed.
    fn sift_down(&mut self, index: usize, n: usize) -> bool {
        assert!(index < self.heap.len() && n <= self.heap.len());
        let mut i = index;
        let mut child = i * 2 + 1;
        while child < n {
            if child + 1 < n && self.heap[child + 1].expires < self.heap[child].expires {
                child += 1;
            }
            if self.heap[i].expires <= self.heap[child].expires {
                break;
            }
            self.swap(i, child);
            i = child;
            child = i * 2 + 1;
        }
        index < i
    }
}

impl Default for TimerHeap {
    fn default() -> Self {
        TimerHeap::new()
    }
}
