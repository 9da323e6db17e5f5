//! A level: an ordered sequence of buckets sharing one max bucket size.
//!
//! ```text
//!   buckets:  [ B0 ] [ B1 ] [ B2 ] ... [ max-buf ]
//!   sup:       s0  <  s1  <  s2  <      sup()
//!   items:     k <= s0 | s0 < k <= s1 | ...| k > s_{d-2}
//! ```
//!
//! Regular buckets hold between `min_bucket_size / 2` and `max_bucket_size`
//! items (the factor 2 is the split-repair slack); the max-buf is unbounded
//! and flushed into the next coarser level by the batched queue when it
//! overflows. A cached classifier over the regular suprema routes inserted
//! batches; any structural change to the bucket sequence invalidates it.
//!
//! Splits are α-way: sampled splitters carve one oversized bucket into up
//! to `split_factor` new ones, joining undersized results onto their
//! neighbours right-to-left. When the level has no room for an α-way split,
//! the tail buckets retire into the max-buf instead.

use std::mem;

use crate::config::QueueConfig;
use crate::ds::bucket::Bucket;
use crate::ds::classifier::Classifier;
use crate::ds::sampler::SplitterSampler;
use crate::trace::trace_event;
use crate::traits::{QueueItem, QueueKey};

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;

pub(crate) struct Level<I: QueueItem> {
    cfg: QueueConfig,
    max_bucket_size: usize,
    // whether this level is currently the coarsest; gates max-buf splits
    is_last: bool,
    buckets: Vec<Bucket<I>>,
    classifier: Classifier<I::Key>,
}

impl<I: QueueItem> Level<I> {
    /// Creates the finest level, with `max_bucket_size = buf_base_size`.
    pub(crate) fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            max_bucket_size: cfg.buf_base_size(),
            is_last: true,
            buckets: Vec::new(),
            classifier: Classifier::new(),
        }
    }

    /// Creates the level one step coarser than `self`.
    pub(crate) fn next_coarser(&self) -> Self {
        Self {
            cfg: self.cfg,
            max_bucket_size: self.max_bucket_size * self.cfg.growth_rate(),
            is_last: true,
            buckets: Vec::new(),
            classifier: Classifier::new(),
        }
    }

    pub(crate) fn degree(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub(crate) fn overflow(&self) -> bool {
        self.max_buf_len() > self.max_bucket_size
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn max_bucket_size(&self) -> usize {
        self.max_bucket_size
    }

    /// Removes and returns the min-bucket.
    pub(crate) fn pop_min(&mut self) -> Bucket<I> {
        assert!(!self.buckets.is_empty());

        let result = self.buckets.remove(0);
        self.classifier.invalidate();

        debug_assert!(result.len() <= self.max_bucket_size);
        self.trace_state("pop_min:after");
        result
    }

    /// Batch-inserts items known to lie within this level's key range.
    pub(crate) fn insert(&mut self, items: Vec<I>, sampler: &mut SplitterSampler) {
        debug_assert!(self.degree() <= self.cfg.max_degree());
        debug_assert!(2 * items.len() >= self.min_bucket_size() / self.cfg.growth_rate());
        debug_assert!(2 * items.len() >= self.cfg.buf_base_size() / self.cfg.split_factor());
        debug_assert!(items.len() <= 2 * self.max_bucket_size);
        #[cfg(debug_assertions)]
        let expected_len = self.len() + items.len();

        if self.buckets.is_empty() {
            self.buckets.push(Bucket::default());
        }

        if self.buckets.len() == 1 {
            // only one bucket, so just append all items onto it
            // this can only happen in the last level
            self.buckets[0].buf.extend(items);
        } else {
            self.distribute(items);
        }

        // clear the supremum of the last bucket as we might have invalidated
        // it (it may have been the only pre-existing bucket)
        let last = self.degree() - 1;
        self.buckets[last].sup = I::Key::sup();

        self.fix_overflowing_buckets(0, self.degree(), sampler);

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
        self.trace_state("insert:after");
    }

    /// Installs an overflowing bucket from the finer side at position 0 and
    /// splits it into legally sized pieces.
    pub(crate) fn insert_min(&mut self, bucket: Bucket<I>, sampler: &mut SplitterSampler) {
        debug_assert!(self.degree() <= self.cfg.max_degree());
        debug_assert!(bucket.len() >= self.max_bucket_size);
        debug_assert!(bucket.len() <= 3 * self.max_bucket_size);
        #[cfg(debug_assertions)]
        let expected_len = self.len() + bucket.len();

        self.buckets.insert(0, bucket);

        self.shrink_to_degree(self.cfg.max_degree() - self.cfg.split_factor() + 1);
        self.split_at(0, self.cfg.split_factor(), sampler);

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
        self.trace_state("insert_min:after");
    }

    /// Moves the tail of the max-buf into the next coarser level, keeping
    /// `min_bucket_size` items behind.
    pub(crate) fn flush_max_buf_into(&mut self, next: &mut Level<I>, sampler: &mut SplitterSampler) {
        self.is_last = false;
        self.flush_max_buf_impl(next, false, sampler);
    }

    /// Steals the next level's min-bucket as this level's new max-buf.
    pub(crate) fn refill_from(&mut self, next: &mut Level<I>, sampler: &mut SplitterSampler) {
        debug_assert_eq!(self.degree(), self.cfg.min_degree() + 1);
        debug_assert!(next.degree() > 0);

        trace_event!(event = "refill_from_next", lvl = self.trace_idx());

        // flush our max-buf (the alternative would be merging it with the
        // incoming bucket)
        self.flush_max_buf_impl(next, true, sampler);

        // steal the min-bucket from the next level
        let last = self.degree() - 1;
        self.buckets[last] = next.pop_min();
        self.is_last = next.degree() == 0;

        // Since we push at least α-1 times our min bucket size, the incoming
        // bucket must hold at least as many items
        debug_assert!(
            self.max_buf_len() >= (self.cfg.split_factor() - 1) * self.min_bucket_size()
        );

        // If we did not pull the next level's last bucket, its size is at
        // least half our full-split threshold
        let full_split_threshold = self.min_bucket_size() * self.cfg.growth_rate();
        debug_assert!(self.is_last || self.max_buf_len() >= full_split_threshold / 2);

        // In any case, the next level's max-size constraint bounds it
        debug_assert!(self.max_buf_len() <= self.cfg.growth_rate() * self.max_bucket_size);

        // If we pulled the next level's last bucket, it might be small enough
        if self.max_buf_len() <= self.max_bucket_size {
            return;
        }

        let split_degree = if self.max_buf_len() >= full_split_threshold {
            self.cfg.growth_rate()
        } else {
            self.max_buf_len() / self.min_bucket_size()
        };

        trace_event!(event = "split_max", degree = split_degree);
        self.split_at(self.degree() - 1, split_degree, sampler);
    }

    fn max_buf_len(&self) -> usize {
        debug_assert!(!self.buckets.is_empty());
        self.buckets[self.degree() - 1].len()
    }

    fn min_bucket_size(&self) -> usize {
        self.max_bucket_size / self.cfg.split_factor()
    }

    // Rebuilds the cached classifier if needed and routes each item to the
    // bucket whose key range contains it.
    fn distribute(&mut self, items: Vec<I>) {
        #[cfg(debug_assertions)]
        let expected_len = self.len() + items.len();

        if !self.classifier.valid() {
            trace_event!(event = "rebuild_classifier", lvl = self.trace_idx());
            let splitters: Vec<I::Key> = self.buckets[..self.degree() - 1]
                .iter()
                .map(|b| b.sup)
                .collect();
            self.classifier.build(&splitters);
        }

        let Self {
            classifier,
            buckets,
            ..
        } = self;
        classifier.classify(items, |class, item| buckets[class].buf.push(item));

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
    }

    fn flush_max_buf_impl(
        &mut self,
        next: &mut Level<I>,
        flush_all: bool,
        sampler: &mut SplitterSampler,
    ) {
        debug_assert!(self.degree() > self.cfg.min_degree());

        trace_event!(
            event = "flush_max",
            lvl = self.trace_idx(),
            size = self.max_buf_len()
        );

        let last = self.degree() - 1;
        if flush_all {
            let items = mem::take(&mut self.buckets[last].buf);
            next.insert(items, sampler);
        } else {
            debug_assert!(self.max_buf_len() >= self.max_bucket_size);
            let keep = self.min_bucket_size();
            let tail = self.buckets[last].buf.split_off(keep);
            next.insert(tail, sampler);
        }

        debug_assert!(self.max_buf_len() <= self.max_bucket_size);
    }

    // α-way splits any overflowing buckets in [begin, end-1), then decides
    // whether the bucket at end-1 may be split as well. Returns the updated
    // end index.
    fn fix_overflowing_buckets(
        &mut self,
        begin: usize,
        mut end: usize,
        sampler: &mut SplitterSampler,
    ) -> usize {
        #[cfg(debug_assertions)]
        let expected_len = self.len();
        debug_assert!(end <= self.degree());

        let mut idx = begin;
        while idx + 1 < end {
            if self.buckets[idx].len() <= self.max_bucket_size {
                idx += 1;
                continue;
            }

            // split the overflowing bucket, then skip over its new siblings
            let split_end = self.split_at(idx, self.cfg.split_factor(), sampler);
            end = self
                .degree()
                .min((end + split_end).saturating_sub(idx + 1));
            idx = split_end;
        }

        debug_assert!(end <= self.degree());
        let max_split_degree = self.cfg.max_degree() - self.cfg.split_factor() + 1;
        let max_buf_splittable = self.is_last && end <= max_split_degree;
        if (end < self.degree() || max_buf_splittable)
            && self.buckets[end - 1].len() > self.max_bucket_size
        {
            // the bucket at end-1 is not acting as a max-buf, so split it too
            end = self.split_at(end - 1, self.cfg.split_factor(), sampler);
        }

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
        end
    }

    // Joins trailing regular buckets onto the max-buf until the degree drops
    // to `target`.
    fn shrink_to_degree(&mut self, target: usize) {
        #[cfg(debug_assertions)]
        let expected_len = self.len();

        if self.degree() > target {
            trace_event!(
                event = "join",
                lvl = self.trace_idx(),
                count = self.degree() - target
            );
            self.classifier.invalidate();
        }

        while self.degree() > target {
            // remove the penultimate bucket and join it onto the max-buf
            let penultimate = self.buckets.remove(self.degree() - 2);
            let last = self.degree() - 1;
            self.buckets[last].buf.extend(penultimate.buf);
        }

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
    }

    // Splits the bucket at `idx` into up to `split_degree` new buckets via
    // sampled splitters, repairing undersized results by joining them onto
    // their neighbours. Returns the index one past the surviving new
    // buckets, after cascading any induced overflows.
    fn split_at(&mut self, idx: usize, split_degree: usize, sampler: &mut SplitterSampler) -> usize {
        #[cfg(debug_assertions)]
        let expected_len = self.len();
        debug_assert!(split_degree >= self.cfg.split_factor());

        // the degree must stay at or below this for an α-way split to fit
        let max_split_degree = self.cfg.max_degree() - self.cfg.split_factor() + 1;

        if idx + 1 >= max_split_degree {
            // no room: retire this bucket and all following regular buckets
            // into the max-buf
            self.trace_state("retire");
            self.shrink_to_degree(idx + 1);
            return idx;
        }
        self.trace_state("split:before");

        // first make room for the new buckets by retiring the last few, if
        // necessary
        self.shrink_to_degree(max_split_degree);
        self.trace_state("split:after_shrink");

        let buf = mem::take(&mut self.buckets[idx].buf);
        debug_assert!(self.min_bucket_size() <= buf.len() / split_degree);

        // determine splitters and insert them with empty buffers; the old
        // splitter stays as the supremum of the last new bucket
        let keys: Vec<I::Key> = buf.iter().map(QueueItem::key).collect();
        let splitters = sampler.splitters(&keys, split_degree);
        let mut num_new = splitters.len();
        debug_assert!(num_new < split_degree);

        self.buckets
            .splice(idx..idx, splitters.iter().map(|&sup| Bucket::new(sup)));
        self.classifier.invalidate();

        trace_event!(
            event = "split:splitters",
            lvl = self.trace_idx(),
            idx,
            degree = num_new + 1
        );

        let local = Classifier::with_splitters(&splitters);
        let split_buckets = &mut self.buckets[idx..];
        local.classify(buf, |class, item| split_buckets[class].buf.push(item));

        // from right to left, join underflowing new buckets onto their
        // predecessors (which inherit the supremum)
        let min_size = self.min_bucket_size();
        let mut j = idx + num_new;
        while j > idx {
            if 2 * self.buckets[j].len() >= min_size {
                j -= 1;
                continue;
            }
            trace_event!(event = "split:repair", lvl = self.trace_idx(), idx = j - idx);
            let joined = self.buckets.remove(j);
            self.buckets[j - 1].buf.extend(joined.buf);
            self.buckets[j - 1].sup = joined.sup;
            num_new -= 1;
            j -= 1;
        }

        // if the leftmost bucket underflows, join it onto its successor
        if 2 * self.buckets[idx].len() < min_size {
            trace_event!(event = "split:repair", lvl = self.trace_idx(), idx = 0usize);
            debug_assert!(idx + 1 < self.degree());
            let joined = self.buckets.remove(idx);
            self.buckets[idx].buf.extend(joined.buf);
            num_new -= 1;
        }

        #[cfg(debug_assertions)]
        debug_assert_eq!(self.len(), expected_len);
        self.fix_overflowing_buckets(idx, idx + num_new + 1, sampler)
    }

    #[cfg(feature = "trace")]
    fn trace_idx(&self) -> u32 {
        let ratio = self.max_bucket_size / self.cfg.buf_base_size();
        if ratio <= 1 {
            0
        } else {
            ratio.ilog2() / self.cfg.growth_rate().ilog2()
        }
    }

    #[cfg(feature = "trace")]
    fn trace_state(&self, event: &str) {
        let sizes: Vec<usize> = self.buckets.iter().map(Bucket::len).collect();
        tracing::trace!(
            event,
            lvl = self.trace_idx(),
            max_size = self.max_bucket_size,
            degree = self.degree(),
            sizes = ?sizes
        );
    }

    #[cfg(not(feature = "trace"))]
    #[inline(always)]
    fn trace_state(&self, _event: &str) {}

    /// Verifies the structural invariants of this level.
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.degree() > self.cfg.max_degree() {
            return Err(InvariantError::new(format!(
                "degree {} exceeds max degree {}",
                self.degree(),
                self.cfg.max_degree()
            )));
        }

        let d = self.degree();
        for i in 0..d.saturating_sub(1) {
            let bucket = &self.buckets[i];
            if i + 1 < d - 1 && !(bucket.sup < self.buckets[i + 1].sup) {
                return Err(InvariantError::new(format!(
                    "bucket suprema not strictly increasing at {i}"
                )));
            }
            if bucket.len() > self.max_bucket_size {
                return Err(InvariantError::new(format!(
                    "regular bucket {i} holds {} items, max is {}",
                    bucket.len(),
                    self.max_bucket_size
                )));
            }
            if 2 * bucket.len() < self.min_bucket_size() {
                return Err(InvariantError::new(format!(
                    "regular bucket {i} holds {} items, repair floor is {}",
                    bucket.len(),
                    self.min_bucket_size()
                )));
            }
        }

        for i in 0..d {
            let bucket = &self.buckets[i];
            if i + 1 < d {
                if let Some(item) = bucket.buf.iter().find(|x| !(x.key() <= bucket.sup)) {
                    return Err(InvariantError::new(format!(
                        "bucket {i} holds key {:?} above its supremum {:?}",
                        item.key(),
                        bucket.sup
                    )));
                }
            }
            if i > 0 {
                let lower = self.buckets[i - 1].sup;
                if let Some(item) = bucket.buf.iter().find(|x| !(x.key() > lower)) {
                    return Err(InvariantError::new(format!(
                        "bucket {i} holds key {:?} at or below its predecessor's \
                         supremum {:?}",
                        item.key(),
                        lower
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> QueueConfig {
        QueueConfig::try_new(64, 4).unwrap()
    }

    #[test]
    fn first_insert_creates_a_single_max_buf() {
        let mut level: Level<i64> = Level::new(test_cfg());
        let mut sampler = SplitterSampler::new();

        level.insert((1..=64).collect(), &mut sampler);
        assert_eq!(level.degree(), 1);
        assert_eq!(level.len(), 64);
        assert!(!level.overflow());
        level.check_invariants().unwrap();
    }

    #[test]
    fn overflowing_last_level_splits_its_max_buf() {
        let mut level: Level<i64> = Level::new(test_cfg());
        let mut sampler = SplitterSampler::new();

        for chunk in (1..=256).collect::<Vec<i64>>().chunks(64) {
            level.insert(chunk.to_vec(), &mut sampler);
        }
        // 256 items in a 64-item-bucket level: the max-buf must have split
        assert!(level.degree() > 1);
        assert_eq!(level.len(), 256);
        level.check_invariants().unwrap();
    }

    #[test]
    fn pop_min_returns_the_smallest_bucket() {
        let mut level: Level<i64> = Level::new(test_cfg());
        let mut sampler = SplitterSampler::new();

        for chunk in (1..=512).collect::<Vec<i64>>().chunks(64) {
            level.insert(chunk.to_vec(), &mut sampler);
        }
        let degree_before = level.degree();
        assert!(degree_before > 1);

        let min_bucket = level.pop_min();
        assert!(!min_bucket.is_empty());
        assert_eq!(level.degree(), degree_before - 1);

        let max_popped = min_bucket
            .buf
            .iter()
            .map(|x| x.key())
            .fold(i64::MIN, i64::max);
        for bucket in &level.buckets {
            assert!(bucket.buf.iter().all(|x| x.key() > max_popped));
        }
    }

    #[test]
    fn insert_min_installs_and_splits_the_bucket() {
        let mut level: Level<i64> = Level::new(test_cfg());
        let mut sampler = SplitterSampler::new();

        // seed the level so it has a bucket structure to prepend into
        for chunk in (1000..=1511).collect::<Vec<i64>>().chunks(64) {
            level.insert(chunk.to_vec(), &mut sampler);
        }

        let mut incoming: Bucket<i64> = Bucket::new(999);
        incoming.buf.extend(1..=128);
        let before = level.len();
        level.insert_min(incoming, &mut sampler);

        assert_eq!(level.len(), before + 128);
        level.check_invariants().unwrap();

        // the smallest keys must now come out first
        let min_bucket = level.pop_min();
        assert!(min_bucket.buf.iter().all(|&k| k <= 128));
    }
}
