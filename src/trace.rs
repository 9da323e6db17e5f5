//! Zero-cost lifecycle tracing.
//!
//! With the `trace` feature enabled, queue components emit structural events
//! (`add_lvl`, `flush_max`, `split:*`, `join`, ...) through `tracing::trace!`.
//! Without the feature the macro expands to nothing, so no arguments are
//! evaluated and no tracing code is compiled.

#[cfg(feature = "trace")]
macro_rules! trace_event {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "trace"))]
macro_rules! trace_event {
    ($($arg:tt)*) => {};
}

pub(crate) use trace_event;
