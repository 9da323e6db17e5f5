//! Queue configuration and derived degree constants.
//!
//! The queue is parameterised by two numbers:
//!
//! | Field            | Meaning                                           |
//! |------------------|---------------------------------------------------|
//! | `buf_base_size`  | B: items per base buffer (~one L1 working set)    |
//! | `log_max_degree` | log₂ of the maximum bucket count per level        |
//!
//! Everything else is derived:
//!
//! ```text
//!   max_degree   = 2^log_max_degree
//!   min_degree   = max_degree / 2
//!   split_factor = 2^(log_max_degree / 2)     (α, buckets per split)
//!   growth_rate  = max_degree - min_degree    (g, level size ratio)
//! ```
//!
//! During an insert a level can receive up to three times its max bucket
//! size. If all of those items land in a single bucket, a regular α-way
//! split must still produce buckets of legal size, which requires
//! `split_factor >= 4` and hence `log_max_degree >= 4`.

use crate::ds::classifier::UNROLL;
use crate::error::ConfigError;

/// Runtime configuration record for the queue.
///
/// Constructed through [`QueueConfig::try_new`] (validated) or
/// [`QueueConfig::for_item`] (derived defaults); both keep the fields
/// private so every live config is known-valid.
///
/// # Example
///
/// ```
/// use queuekit::config::QueueConfig;
///
/// let cfg = QueueConfig::try_new(64, 4).unwrap();
/// assert_eq!(cfg.max_degree(), 16);
/// assert_eq!(cfg.min_degree(), 8);
/// assert_eq!(cfg.split_factor(), 4);
/// assert_eq!(cfg.growth_rate(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    buf_base_size: usize,
    log_max_degree: u32,
}

impl QueueConfig {
    /// Default degree exponent: `max_degree = 64`, `split_factor = 8`.
    pub const DEFAULT_LOG_MAX_DEGREE: u32 = 6;

    /// Target bytes for one base buffer (roughly an L1 working set).
    const BASE_BUFFER_BYTES: usize = 1 << 15;

    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// - `log_max_degree < 4`: the derived split factor would fall below 4.
    /// - `log_max_degree > 16`: bucket counts beyond any sensible cache
    ///   hierarchy.
    /// - `buf_base_size < 2 * split_factor * 7`: the classifier unrolls its
    ///   inner loop seven-wide, which must not exceed the minimum batch the
    ///   level preconditions admit.
    pub fn try_new(buf_base_size: usize, log_max_degree: u32) -> Result<Self, ConfigError> {
        if log_max_degree < 4 {
            return Err(ConfigError::new(format!(
                "log_max_degree must be at least 4 (got {log_max_degree}): \
                 the split factor 2^(log_max_degree/2) must be at least 4"
            )));
        }
        if log_max_degree > 16 {
            return Err(ConfigError::new(format!(
                "log_max_degree must be at most 16 (got {log_max_degree})"
            )));
        }
        let cfg = Self {
            buf_base_size,
            log_max_degree,
        };
        let min_buf = 2 * cfg.split_factor() * UNROLL;
        if buf_base_size < min_buf {
            return Err(ConfigError::new(format!(
                "buf_base_size must be at least {min_buf} for log_max_degree \
                 {log_max_degree} (got {buf_base_size})"
            )));
        }
        Ok(cfg)
    }

    /// Derives a default configuration for the given item type.
    ///
    /// Sizes the base buffer so that roughly four of them fit in a typical
    /// L1 cache, clamped to the smallest legal value for the default degree.
    ///
    /// # Example
    ///
    /// ```
    /// use queuekit::config::QueueConfig;
    ///
    /// let cfg = QueueConfig::for_item::<u64>();
    /// assert_eq!(cfg.buf_base_size(), 4096);
    /// assert_eq!(cfg.max_degree(), 64);
    /// ```
    pub fn for_item<I>() -> Self {
        let item_size = std::mem::size_of::<I>().max(1);
        let cfg = Self {
            buf_base_size: 1,
            log_max_degree: Self::DEFAULT_LOG_MAX_DEGREE,
        };
        let min_buf = 2 * cfg.split_factor() * UNROLL;
        Self {
            buf_base_size: (Self::BASE_BUFFER_BYTES / item_size).max(min_buf),
            ..cfg
        }
    }

    /// Items per base buffer (B).
    #[inline]
    pub fn buf_base_size(&self) -> usize {
        self.buf_base_size
    }

    /// log₂ of the maximum level degree.
    #[inline]
    pub fn log_max_degree(&self) -> u32 {
        self.log_max_degree
    }

    /// Maximum number of buckets per level.
    #[inline]
    pub fn max_degree(&self) -> usize {
        1 << self.log_max_degree
    }

    /// Degree threshold below which a level refills from the next one.
    #[inline]
    pub fn min_degree(&self) -> usize {
        self.max_degree() / 2
    }

    /// α: the number of buckets a split aims to produce.
    #[inline]
    pub fn split_factor(&self) -> usize {
        1 << (self.log_max_degree / 2)
    }

    /// g: the ratio between consecutive levels' max bucket sizes.
    #[inline]
    pub fn growth_rate(&self) -> usize {
        self.max_degree() - self.min_degree()
    }
}

impl Default for QueueConfig {
    /// Default configuration for word-sized items: `B = 4096`,
    /// `log_max_degree = 6`.
    fn default() -> Self {
        Self {
            buf_base_size: 4096,
            log_max_degree: Self::DEFAULT_LOG_MAX_DEGREE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_constants_for_default_degree() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.max_degree(), 64);
        assert_eq!(cfg.min_degree(), 32);
        assert_eq!(cfg.split_factor(), 8);
        assert_eq!(cfg.growth_rate(), 32);
    }

    #[test]
    fn derived_constants_for_small_degree() {
        let cfg = QueueConfig::try_new(64, 4).unwrap();
        assert_eq!(cfg.max_degree(), 16);
        assert_eq!(cfg.min_degree(), 8);
        assert_eq!(cfg.split_factor(), 4);
        assert_eq!(cfg.growth_rate(), 8);
    }

    #[test]
    fn odd_degree_exponent_rounds_split_factor_down() {
        let cfg = QueueConfig::try_new(256, 5).unwrap();
        assert_eq!(cfg.max_degree(), 32);
        assert_eq!(cfg.split_factor(), 4);
        assert_eq!(cfg.growth_rate(), 16);
    }

    #[test]
    fn rejects_degree_exponent_below_four() {
        assert!(QueueConfig::try_new(4096, 3).is_err());
        assert!(QueueConfig::try_new(4096, 0).is_err());
    }

    #[test]
    fn rejects_oversized_degree_exponent() {
        assert!(QueueConfig::try_new(1 << 20, 17).is_err());
    }

    #[test]
    fn rejects_base_buffer_below_unroll_floor() {
        // split_factor = 4 at log_max_degree = 4, so the floor is 56
        assert!(QueueConfig::try_new(55, 4).is_err());
        assert!(QueueConfig::try_new(56, 4).is_ok());
    }

    #[test]
    fn for_item_scales_with_item_size() {
        assert_eq!(QueueConfig::for_item::<u64>().buf_base_size(), 4096);
        assert_eq!(QueueConfig::for_item::<[u8; 16]>().buf_base_size(), 2048);
    }

    #[test]
    fn for_item_clamps_large_items_to_legal_minimum() {
        let cfg = QueueConfig::for_item::<[u8; 4096]>();
        assert_eq!(cfg.buf_base_size(), 2 * cfg.split_factor() * 7);
    }
}
