//! Error types for sampler construction.
//!
//! The sampling core has no recoverable runtime errors: upstream closure is
//! the orderly shutdown path, not a fault, and dropped values are dropped by
//! design. The only thing that can go wrong is constructing a sampler with a
//! configuration that would busy-loop, which is rejected fast.

use thiserror::Error;

/// Result type alias for sampler operations.
pub type Result<T, E = SampleError> = std::result::Result<T, E>;

/// Error type for sampler construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SampleError {
    /// The sampling period was zero.
    ///
    /// A zero period has no defined emission cadence and would degenerate
    /// into a busy loop, so it is rejected at construction time.
    #[error("sampling period must be greater than zero")]
    ZeroPeriod,
}
