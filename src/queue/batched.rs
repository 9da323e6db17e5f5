//! Batched priority queue: a stack of levels with geometrically growing
//! bucket sizes.
//!
//! Level `k` has `max_bucket_size = B · g^k`, so the hierarchy covers n
//! items in O(log_g (n/B)) levels. Inserts land in the finest level and
//! overflows cascade outward; `pop_min` removes the finest min-bucket and
//! underflowing levels refill by stealing buckets inward. All item movement
//! is bucket-at-a-time, which is what amortises the per-item work down to
//! scans of contiguous buffers.

use crate::config::QueueConfig;
use crate::ds::bucket::Bucket;
use crate::ds::sampler::SplitterSampler;
use crate::queue::level::Level;
use crate::trace::trace_event;
use crate::traits::QueueItem;

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;

/// Lower-level batched interface: whole buckets in, whole buckets out.
///
/// Most users want [`PriorityQueue`](crate::queue::pq::PriorityQueue),
/// which buffers individual pushes and pops in front of this type.
///
/// # Example
///
/// ```
/// use queuekit::prelude::*;
///
/// let cfg = QueueConfig::try_new(64, 4).unwrap();
/// let mut bpq = BatchedPriorityQueue::<i64>::with_config(cfg);
///
/// bpq.insert((1..=64).collect());
/// bpq.insert((65..=128).collect());
///
/// let bucket = bpq.pop_min();
/// assert!(!bucket.is_empty());
/// assert_eq!(bpq.len(), 128 - bucket.len());
/// ```
pub struct BatchedPriorityQueue<I: QueueItem> {
    cfg: QueueConfig,
    len: usize,
    sampler: SplitterSampler,
    // sorted from finest to coarsest (ascending order of keys)
    levels: Vec<Level<I>>,
}

impl<I: QueueItem> BatchedPriorityQueue<I> {
    /// Creates an empty queue with the default configuration for `I`.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::for_item::<I>())
    }

    /// Creates an empty queue with the given configuration.
    pub fn with_config(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            len: 0,
            sampler: SplitterSampler::new(),
            levels: vec![Level::new(cfg)],
        }
    }

    /// Returns the configuration in effect.
    #[inline]
    pub fn config(&self) -> QueueConfig {
        self.cfg
    }

    /// Returns the total number of items across all levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the queue holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a batch of at most `2 · buf_base_size` items.
    pub fn insert(&mut self, items: Vec<I>) {
        debug_assert!(items.len() <= 2 * self.cfg.buf_base_size());

        self.len += items.len();
        self.levels[0].insert(items, &mut self.sampler);
        self.handle_max_buf_overflow_from(0);

        self.trace_state("insert:after");
    }

    /// Installs a bucket at the min side of the finest level.
    pub fn insert_min(&mut self, bucket: Bucket<I>) {
        self.len += bucket.len();
        self.levels[0].insert_min(bucket, &mut self.sampler);
        self.handle_max_buf_overflow_from(0);

        self.trace_state("insert_min:after");
    }

    /// Removes and returns the finest level's min-bucket.
    pub fn pop_min(&mut self) -> Bucket<I> {
        let min_bucket = self.levels[0].pop_min();

        // refill any levels whose degree underflows (if possible)
        self.handle_degree_underflow();

        self.len -= min_bucket.len();
        self.trace_state("pop_min:after");
        min_bucket
    }

    // Flushes overflowing max-buffers left to right starting at `begin`,
    // appending a new coarsest level if the cascade reaches the end.
    fn handle_max_buf_overflow_from(&mut self, begin: usize) {
        let mut i = begin;
        while i + 1 < self.levels.len() && self.levels[i].overflow() {
            let (head, tail) = self.levels.split_at_mut(i + 1);
            head[i].flush_max_buf_into(&mut tail[0], &mut self.sampler);
            i += 1;
        }

        // i is the rightmost level that received items; if it is the last
        // level and overflows too, add a new one
        if i + 1 == self.levels.len() && self.levels[i].overflow() {
            trace_event!(event = "add_lvl", idx = self.levels.len());
            debug_assert!(
                self.levels[i].degree() > self.cfg.max_degree() - self.cfg.split_factor()
            );

            let new_level = self.levels[i].next_coarser();
            self.levels.push(new_level);
            let (head, tail) = self.levels.split_at_mut(i + 1);
            head[i].flush_max_buf_into(&mut tail[0], &mut self.sampler);
        }
    }

    // Refills levels whose degree dropped to the threshold by stealing
    // buckets from the next coarser level, left to right.
    fn handle_degree_underflow(&mut self) {
        let threshold = self.cfg.min_degree() + 1;

        let mut i = 0;
        while i + 1 < self.levels.len() && self.levels[i].degree() <= threshold {
            let (head, tail) = self.levels.split_at_mut(i + 1);
            let (level, next) = (&mut head[i], &mut tail[0]);

            level.refill_from(next, &mut self.sampler);
            if level.overflow() {
                // a bad split can overflow the receiving level
                level.flush_max_buf_into(next, &mut self.sampler);
            }
            i += 1;
        }

        // if no refill happened, return; this also preserves at least one
        // level at all times
        if i == 0 {
            return;
        }

        // if the last level has been drained, remove it
        if i + 1 == self.levels.len() && self.levels[i].degree() == 0 {
            self.levels.pop();
            return;
        }

        // the level at i may have been pushed into by the flush-back above,
        // so cascade any overflow from there
        self.handle_max_buf_overflow_from(i);
    }

    #[cfg(feature = "trace")]
    fn trace_state(&self, event: &str) {
        let degrees: Vec<usize> = self.levels.iter().map(Level::degree).collect();
        tracing::trace!(event, size = self.len, levels = ?degrees);
    }

    #[cfg(not(feature = "trace"))]
    #[inline(always)]
    fn trace_state(&self, _event: &str) {}

    /// Verifies the structural invariants of every level plus the level
    /// size geometry.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut expected_max = self.cfg.buf_base_size();
        let mut total = 0;
        for (k, level) in self.levels.iter().enumerate() {
            if level.max_bucket_size() != expected_max {
                return Err(InvariantError::new(format!(
                    "level {k} has max bucket size {}, expected {expected_max}",
                    level.max_bucket_size()
                )));
            }
            level.check_invariants()?;
            total += level.len();
            expected_max *= self.cfg.growth_rate();
        }
        if total != self.len {
            return Err(InvariantError::new(format!(
                "level sizes sum to {total} but the queue records {}",
                self.len
            )));
        }
        Ok(())
    }
}

impl<I: QueueItem> Default for BatchedPriorityQueue<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::QueueItem as _;

    fn test_cfg() -> QueueConfig {
        QueueConfig::try_new(64, 4).unwrap()
    }

    #[test]
    fn batches_come_back_out_as_disjoint_sorted_buckets() {
        let mut bpq: BatchedPriorityQueue<i64> = BatchedPriorityQueue::with_config(test_cfg());

        for chunk in (1..=1024).collect::<Vec<i64>>().chunks(64) {
            bpq.insert(chunk.to_vec());
        }
        assert_eq!(bpq.len(), 1024);

        let mut max_popped = 0i64;
        let mut total = 0usize;
        while !bpq.is_empty() {
            let bucket = bpq.pop_min();
            assert!(!bucket.is_empty());

            let kmin = bucket.buf.iter().map(|x| x.key()).fold(i64::MAX, i64::min);
            let kmax = bucket.buf.iter().map(|x| x.key()).fold(i64::MIN, i64::max);
            assert!(max_popped < kmin);
            assert!(kmax <= bucket.sup);
            max_popped = kmax;
            total += bucket.len();
        }
        assert_eq!(total, 1024);
    }

    #[test]
    fn reverse_order_batches_are_routed_correctly() {
        let mut bpq: BatchedPriorityQueue<i64> = BatchedPriorityQueue::with_config(test_cfg());

        for chunk in (1..=1024).rev().collect::<Vec<i64>>().chunks(64) {
            bpq.insert(chunk.to_vec());
        }

        let mut popped: Vec<i64> = Vec::new();
        while !bpq.is_empty() {
            popped.extend(bpq.pop_min().buf);
        }
        popped.sort_unstable();
        assert_eq!(popped, (1..=1024).collect::<Vec<i64>>());
    }

    #[test]
    fn grows_levels_and_drains_back_to_one() {
        let mut bpq: BatchedPriorityQueue<i64> = BatchedPriorityQueue::with_config(test_cfg());

        // enough items to force at least a second level (B=64, g=8)
        for chunk in (1..=16_384).collect::<Vec<i64>>().chunks(64) {
            bpq.insert(chunk.to_vec());
        }
        assert!(bpq.levels.len() > 1);
        bpq.check_invariants().unwrap();

        while !bpq.is_empty() {
            bpq.pop_min();
        }
        assert_eq!(bpq.levels.len(), 1);
        assert_eq!(bpq.len(), 0);
    }

    #[test]
    fn size_accounting_tracks_bucket_moves() {
        let mut bpq: BatchedPriorityQueue<i64> = BatchedPriorityQueue::with_config(test_cfg());

        for chunk in (1..=512).collect::<Vec<i64>>().chunks(64) {
            bpq.insert(chunk.to_vec());
        }
        let bucket = bpq.pop_min();
        assert_eq!(bpq.len(), 512 - bucket.len());

        let mut refill: Bucket<i64> = Bucket::new(0);
        refill.buf.extend(-64..0);
        refill.sup = -1;
        bpq.insert_min(refill);
        assert_eq!(bpq.len(), 512 - bucket.len() + 64);
    }
}
