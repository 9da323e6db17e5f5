//! Splitter selection by oversampling.
//!
//! To split a bucket `d` ways, draw `⌊log₂ n⌋ · d − 1` keys uniformly with
//! replacement, sort them, and keep every `⌊log₂ n⌋`-th element: the strided
//! order statistics approximate equi-quantiles, and the oversampling factor
//! bounds the expected bucket-size imbalance. Adjacent duplicates are
//! dropped so no splitter produces an empty bucket.
//!
//! Index draws use Lemire's nearly divisionless rejection method over a
//! Xoshiro128** generator, which keeps the per-draw cost at one widening
//! multiply in the common case while staying unbiased.

use rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

use crate::traits::{key_cmp, QueueKey};

// Stream selector for default-constructed samplers; splitter quality does
// not depend on the seed, determinism does.
const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Draws sorted, deduplicated splitter keys from an unsorted key set.
///
/// One sampler is shared across all levels of a queue; its generator state
/// advances with every split, so repeated splits of identical buckets do
/// not repeat splitter choices.
#[derive(Debug, Clone)]
pub struct SplitterSampler {
    rng: Xoshiro128StarStar,
}

impl SplitterSampler {
    /// Creates a sampler with the fixed default seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates a sampler seeded from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro128StarStar::seed_from_u64(seed),
        }
    }

    /// Returns up to `num_buckets - 1` strictly increasing splitters drawn
    /// from `keys`.
    ///
    /// Requires `⌊log₂ n⌋ · num_buckets − 1 <= n` where `n = keys.len()`.
    pub fn splitters<K: QueueKey>(&mut self, keys: &[K], num_buckets: usize) -> Vec<K> {
        debug_assert!(!keys.is_empty());
        debug_assert!(num_buckets >= 2);

        let step = oversampling_factor(keys.len());
        let sample_size = step * num_buckets - 1;
        debug_assert!(sample_size <= keys.len());

        let mut sample = Vec::with_capacity(sample_size);
        debug_assert!(u32::try_from(keys.len()).is_ok());
        let bound = keys.len() as u32;
        for _ in 0..sample_size {
            let i = uniform_random_int(&mut self.rng, bound) as usize;
            sample.push(keys[i]);
        }
        sample.sort_unstable_by(key_cmp);

        let mut splitters = Vec::with_capacity(num_buckets - 1);
        let mut idx = step - 1;
        while idx < sample.len() {
            let key = sample[idx];
            if splitters.last().map_or(true, |&last| last < key) {
                splitters.push(key);
            }
            idx += step;
        }
        splitters
    }
}

impl Default for SplitterSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// ⌊log₂ n⌋, clamped to at least 1.
#[inline]
fn oversampling_factor(n: usize) -> usize {
    (n.max(2).ilog2() as usize).max(1)
}

/// Lemire's nearly divisionless unbiased draw from `[0, range)`.
///
/// One widening multiply per draw; the modulo only runs on the rare
/// rejection path (probability `range / 2³²`).
fn uniform_random_int<R: RngCore>(rng: &mut R, range: u32) -> u32 {
    debug_assert!(range > 0);

    let mut product = u64::from(rng.next_u32()) * u64::from(range);
    let mut low = product as u32;
    if low < range {
        let threshold = range.wrapping_neg() % range;
        while low < threshold {
            product = u64::from(rng.next_u32()) * u64::from(range);
            low = product as u32;
        }
    }
    (product >> 32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitters_are_strictly_increasing_members() {
        let keys: Vec<i64> = (0..1024).map(|i| (i * 37) % 1009).collect();
        let mut sampler = SplitterSampler::new();

        let splitters = sampler.splitters(&keys, 8);
        assert!(!splitters.is_empty());
        assert!(splitters.len() <= 7);
        assert!(splitters.windows(2).all(|w| w[0] < w[1]));
        assert!(splitters.iter().all(|s| keys.contains(s)));
    }

    #[test]
    fn splitter_count_bounds_hold_across_sizes() {
        let mut sampler = SplitterSampler::new();
        for n in [64usize, 100, 500, 4096] {
            let keys: Vec<i64> = (1..=n as i64).collect();
            let max_buckets = (n + 1) / oversampling_factor(n);
            for d in [2usize, 4, 8].into_iter().filter(|&d| d <= max_buckets) {
                let splitters = sampler.splitters(&keys, d);
                assert!((1..d).contains(&splitters.len()), "n={n} d={d}");
            }
        }
    }

    #[test]
    fn identical_seeds_reproduce_splitters() {
        let keys: Vec<i64> = (1..=512).collect();
        let mut a = SplitterSampler::with_seed(7);
        let mut b = SplitterSampler::with_seed(7);
        assert_eq!(a.splitters(&keys, 8), b.splitters(&keys, 8));
        assert_eq!(a.splitters(&keys, 4), b.splitters(&keys, 4));
    }

    #[test]
    fn all_equal_keys_collapse_to_one_splitter() {
        let keys = vec![42i64; 256];
        let mut sampler = SplitterSampler::new();
        assert_eq!(sampler.splitters(&keys, 8), vec![42]);
    }

    #[test]
    fn uniform_draws_stay_in_range() {
        let mut rng = Xoshiro128StarStar::seed_from_u64(1);
        for range in [1u32, 2, 3, 7, 64, 1000] {
            for _ in 0..1000 {
                assert!(uniform_random_int(&mut rng, range) < range);
            }
        }
    }

    #[test]
    fn float_keys_are_supported() {
        let keys: Vec<f64> = (1..=256).map(|i| i as f64 / 3.0).collect();
        let mut sampler = SplitterSampler::new();
        let splitters = sampler.splitters(&keys, 4);
        assert!(splitters.windows(2).all(|w| w[0] < w[1]));
    }
}
