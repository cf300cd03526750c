//! Thread-safe FIFO connecting the network threads to the game loop

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// FIFO queue with blocking `take`, non-blocking `try_take` and `put`.
///
/// Unbounded by default. A queue created with [`BoundedQueue::with_capacity`]
/// makes `put` wait while the queue is full; the rest of the interface is the
/// same either way. One lock per queue, never held while calling out.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> BoundedQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Appends an item and wakes one blocked taker
    pub fn put(&self, item: T) {
        let mut items = self.items.lock();
        if let Some(capacity) = self.capacity {
            while items.len() >= capacity {
                self.not_full.wait(&mut items);
            }
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Removes the oldest item, blocking the caller until one is available
    pub fn take(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut items);
        }
    }

    /// Removes the oldest item if there is one; never blocks
    pub fn try_take(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
