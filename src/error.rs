//! Error types for the queuekit library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants` methods).
//! - [`ConfigError`]: Returned when queue configuration parameters are invalid
//!   (e.g. a degree too small for an α-way split, a base buffer too small for
//!   the classifier unroll).
//!
//! ## Example Usage
//!
//! ```
//! use queuekit::config::QueueConfig;
//! use queuekit::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let cfg: Result<QueueConfig, ConfigError> = QueueConfig::try_new(4096, 6);
//! assert!(cfg.is_ok());
//!
//! // Invalid degree exponent is caught without panicking
//! let bad = QueueConfig::try_new(4096, 2);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal queue invariants are violated.
///
/// Produced by debug-only `check_invariants` methods on the level and
/// batched-queue types. Carries a human-readable description of which
/// invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when queue configuration parameters are invalid.
///
/// Produced by [`QueueConfig::try_new`](crate::config::QueueConfig::try_new).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use queuekit::config::QueueConfig;
///
/// let err = QueueConfig::try_new(8, 6).unwrap_err();
/// assert!(err.to_string().contains("buf_base_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("bucket supremum out of order");
        assert_eq!(err.to_string(), "bucket supremum out of order");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("log_max_degree must be at least 4");
        assert_eq!(err.to_string(), "log_max_degree must be at least 4");
    }

    #[test]
    fn config_debug_includes_message() {
        let err = ConfigError::new("bad degree");
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("bad degree"));
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }
}
