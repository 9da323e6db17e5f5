//! Branchless bucket classifier over sorted splitter keys.
//!
//! Builds an implicit balanced binary search tree in a contiguous array:
//! the splitters are padded with the `sup()` sentinel up to the next power
//! of two minus one and stored in BFS order starting at slot 1. Classifying
//! a key descends `log₂(num_buckets)` levels, turning each comparison into
//! an index update (`node = 2·node + (splitter < key)`) with no branches.
//!
//! Bucket `i` receives exactly the keys in `(s_i, s_{i+1}]`, taking
//! `s_0 = inf()` and `s_{num_buckets} = sup()`. A key equal to a splitter
//! therefore lands in the bucket the splitter bounds from above.
//!
//! The classify loop is hand-unrolled [`UNROLL`] items wide: indices for a
//! whole chunk are computed before any item is delivered, so the tree
//! descents are independent and can overlap.

use crate::traits::{QueueItem, QueueKey};

/// Width of the hand-unrolled classify loop.
///
/// Must not exceed the smallest batch a level insert can receive, which the
/// config validation enforces as `buf_base_size / split_factor / 2`.
pub(crate) const UNROLL: usize = 7;

/// Implicit-tree classifier mapping keys to bucket indices.
///
/// A classifier is `valid` once built over at least one splitter
/// (`num_buckets >= 2`). `invalidate` clears the bucket count but keeps the
/// tree allocation for the next rebuild.
#[derive(Debug)]
pub struct Classifier<K: QueueKey> {
    tree: Vec<K>,
    num_buckets: usize,
    log_buckets: u32,
}

impl<K: QueueKey> Classifier<K> {
    /// Creates an empty, invalid classifier.
    pub fn new() -> Self {
        Self {
            tree: Vec::new(),
            num_buckets: 0,
            log_buckets: 0,
        }
    }

    /// Creates a classifier built over the given sorted splitters.
    pub fn with_splitters(sorted_splitters: &[K]) -> Self {
        let mut classifier = Self::new();
        classifier.build(sorted_splitters);
        classifier
    }

    /// Returns `true` if the classifier has been built and not invalidated.
    #[inline]
    pub fn valid(&self) -> bool {
        self.num_buckets >= 2
    }

    /// Drops the splitter set; the tree allocation is kept for rebuilding.
    #[inline]
    pub fn invalidate(&mut self) {
        self.num_buckets = 0;
    }

    /// Number of buckets the classifier distributes into.
    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Builds the implicit tree over `sorted_splitters`.
    ///
    /// The splitters must be non-empty, sorted, and strictly inside the key
    /// range (no sentinels).
    pub fn build(&mut self, sorted_splitters: &[K]) {
        assert!(!sorted_splitters.is_empty());
        debug_assert!(sorted_splitters[0].contains());
        debug_assert!(sorted_splitters[sorted_splitters.len() - 1].contains());
        debug_assert!(sorted_splitters.windows(2).all(|w| w[0] <= w[1]));

        self.num_buckets = sorted_splitters.len() + 1;
        self.log_buckets = self.num_buckets.next_power_of_two().ilog2();

        // slot 0 is unused; slots 1..2^log hold the padded splitters in BFS
        // order
        let width = 1usize << self.log_buckets;
        self.tree.clear();
        self.tree.resize(width, K::sup());
        fill_tree(&mut self.tree, sorted_splitters, 1, 0, width - 1);
    }

    /// Classifies every item and hands it to `sink(bucket_index, item)` in
    /// input order.
    pub fn classify<I, F>(&self, items: Vec<I>, mut sink: F)
    where
        I: QueueItem<Key = K>,
        F: FnMut(usize, I),
    {
        debug_assert!(self.valid());

        let mut items = items.into_iter();
        while items.as_slice().len() >= UNROLL {
            let mut classes = [0usize; UNROLL];
            for (class, item) in classes.iter_mut().zip(&items.as_slice()[..UNROLL]) {
                *class = self.classify_key(item.key());
            }
            for &class in &classes {
                if let Some(item) = items.next() {
                    sink(class, item);
                }
            }
        }
        for item in items {
            sink(self.classify_key(item.key()), item);
        }
    }

    /// Returns the bucket index for a single key.
    #[inline]
    pub fn classify_key(&self, key: K) -> usize {
        debug_assert!(self.valid());

        let mut node = 1usize;
        for _ in 0..self.log_buckets {
            node = 2 * node + usize::from(self.tree[node] < key);
        }
        node - (1usize << self.log_buckets)
    }
}

impl<K: QueueKey> Default for Classifier<K> {
    fn default() -> Self {
        Self::new()
    }
}

// Writes the median of the (virtually sup-padded) splitter range [lo, hi)
// into `node` and recurses into both halves.
fn fill_tree<K: QueueKey>(tree: &mut [K], splitters: &[K], node: usize, lo: usize, hi: usize) {
    if lo >= hi {
        return;
    }
    let mid = lo + (hi - lo) / 2;
    if mid < splitters.len() {
        tree[node] = splitters[mid];
    }
    fill_tree(tree, splitters, 2 * node, lo, mid);
    fill_tree(tree, splitters, 2 * node + 1, mid + 1, hi);
}
