//! User-facing priority queue.
//!
//! ## Architecture
//!
//! ```text
//!            push                     pop
//!              │                       ▲
//!              ▼                       │
//!   ┌─────────────────────┐   ┌──────────────────┐
//!   │ max-buffer (~B)     │   │ min-bucket (~B)  │
//!   │ unsorted, keys >    │   │ sentinel-guarded │
//!   │ sup(min-bucket)     │   │ binary min-heap  │
//!   └─────────┬───────────┘   └───────▲──────────┘
//!             │ batch insert          │ pop_min / reclassify
//!             ▼                       │
//!   ┌─────────────────────────────────┴─────┐
//!   │ backend: BatchedPriorityQueue         │
//!   │ levels of geometrically larger buckets│
//!   └───────────────────────────────────────┘
//! ```
//!
//! Individual operations touch only the two ~B-item buffers, which fit in
//! L1; the backend absorbs and produces whole buckets. A pushed key at or
//! below the min-bucket's supremum enters the heap directly (it may be the
//! next minimum); anything larger waits in the max-buffer until a batch of
//! B accumulates.

use std::mem;

use crate::config::QueueConfig;
use crate::ds::bucket::Bucket;
use crate::ds::heap;
use crate::queue::batched::BatchedPriorityQueue;
use crate::traits::{QueueItem, QueueKey};

/// Sample-sort batched priority queue.
///
/// Pops arrive in non-decreasing key order. Keys must satisfy
/// [`QueueKey::contains`]; pushing a sentinel key is a precondition
/// violation and panics.
///
/// # Example
///
/// ```
/// use queuekit::prelude::*;
///
/// let mut pq = PriorityQueue::<i64>::new();
/// pq.push(3);
/// pq.push(1);
/// pq.push(2);
///
/// assert_eq!(pq.len(), 3);
/// assert_eq!(*pq.peek(), 1);
/// assert_eq!(pq.pop(), 1);
/// assert_eq!(pq.pop(), 2);
/// assert_eq!(pq.pop(), 3);
/// assert!(pq.is_empty());
/// ```
pub struct PriorityQueue<I: QueueItem> {
    min_bucket: Bucket<I>,
    max_buffer: Vec<I>,
    backend: BatchedPriorityQueue<I>,
}

impl<I: QueueItem> PriorityQueue<I> {
    /// Creates an empty queue with the default configuration for `I`.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::for_item::<I>())
    }

    /// Creates an empty queue with the given configuration.
    pub fn with_config(cfg: QueueConfig) -> Self {
        let mut min_bucket = Bucket::default();
        min_bucket.buf.reserve(cfg.buf_base_size() + 1);
        min_bucket.buf.push(I::from_key(I::Key::inf()));

        Self {
            min_bucket,
            max_buffer: Vec::new(),
            backend: BatchedPriorityQueue::with_config(cfg),
        }
    }

    /// Returns the configuration in effect.
    #[inline]
    pub fn config(&self) -> QueueConfig {
        self.backend.config()
    }

    /// Returns the number of items in the queue.
    pub fn len(&self) -> usize {
        heap::len(&self.min_bucket.buf) + self.max_buffer.len() + self.backend.len()
    }

    /// Returns `true` if the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the minimum item.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn peek(&self) -> &I {
        assert!(!self.is_empty());
        heap::top(&self.min_bucket.buf)
    }

    /// Inserts an item.
    ///
    /// # Panics
    ///
    /// Panics if the item's key is a sentinel (`inf()` or `sup()`).
    pub fn push(&mut self, item: I) {
        assert!(item.key().contains());

        if self.min_bucket.sup < item.key() {
            self.insert_into_max_buf(item);
        } else {
            self.insert_into_min_buf(item);
        }
    }

    /// Removes and returns the minimum item.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn pop(&mut self) -> I {
        assert!(!self.is_empty());

        let item = self.pop_min_buf();
        if heap::is_empty(&self.min_bucket.buf) && !self.is_empty() {
            self.refill_min_buf();
        }
        item
    }

    fn buf_base_size(&self) -> usize {
        self.config().buf_base_size()
    }

    fn insert_into_max_buf(&mut self, item: I) {
        self.max_buffer.push(item);

        if self.max_buffer.len() >= self.buf_base_size() {
            self.backend.insert(mem::take(&mut self.max_buffer));
        }
    }

    fn insert_into_min_buf(&mut self, item: I) {
        self.min_bucket.buf.push(item);

        // flush eagerly, so the next push classifies against the new
        // splitter
        if self.min_bucket.buf.len() > self.buf_base_size() {
            // drop the heap sentinel: overwrite it with the last element
            if let Some(last) = self.min_bucket.buf.pop() {
                self.min_bucket.buf[0] = last;
            }

            self.flush_min_buf();
            heap::make(&mut self.min_bucket.buf);
        } else {
            heap::push(&mut self.min_bucket.buf);
        }
    }

    // α-way splits the min-bucket in the backend, keeping the new minimum
    // here and leaving the rest behind.
    fn flush_min_buf(&mut self) {
        let full = mem::replace(&mut self.min_bucket, Bucket::default());
        self.backend.insert_min(full);
        self.min_bucket = self.backend.pop_min();
    }

    fn refill_min_buf(&mut self) {
        debug_assert!(heap::is_empty(&self.min_bucket.buf));
        debug_assert!(!self.is_empty());

        if self.backend.is_empty() {
            // drop the heap sentinel; the max-buffer is our new min-buffer
            self.min_bucket.buf.clear();
            self.min_bucket.sup = I::Key::sup();
            mem::swap(&mut self.min_bucket.buf, &mut self.max_buffer);
        } else {
            // get a new min-bucket from the backend and re-route the
            // max-buffer items that now belong to it
            self.min_bucket = self.backend.pop_min();
            self.reclassify_max_buf();
            if self.min_bucket.buf.len() > self.buf_base_size() {
                self.flush_min_buf();
            }
        }

        heap::make(&mut self.min_bucket.buf);
    }

    // Moves every max-buffer item with key <= sup(min-bucket) into the
    // min-buffer. Order among the kept items is irrelevant.
    fn reclassify_max_buf(&mut self) {
        let sup = self.min_bucket.sup;
        let mut i = 0;
        while i < self.max_buffer.len() {
            if sup < self.max_buffer[i].key() {
                i += 1;
            } else {
                let item = self.max_buffer.swap_remove(i);
                self.min_bucket.buf.push(item);
            }
        }
    }

    fn pop_min_buf(&mut self) -> I {
        let buf = &mut self.min_bucket.buf;
        debug_assert!(!heap::is_empty(buf));

        let item = heap::top(buf).clone();
        heap::pop(buf);
        buf.truncate(buf.len() - 1);
        item
    }
}

impl<I: QueueItem> Default for PriorityQueue<I> {
    fn default() -> Self {
        Self::new()
    }
}
