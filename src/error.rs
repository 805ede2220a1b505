//! Error handling and types

use thiserror::Error;

/// Configuration errors raised when constructing a primitive
///
/// These are the only errors the crate produces. Timeouts and a full
/// semaphore are ordinary outcomes and are reported as `bool`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A semaphore needs room for at least one unit
    #[error("semaphore capacity must be at least 1")]
    ZeroCapacity,

    /// The initial count does not fit the capacity
    #[error("semaphore created with initial count {initial} larger than capacity {capacity}")]
    InitialExceedsCapacity {
        /// Requested initial count
        initial: usize,
        /// Requested capacity
        capacity: usize,
    },
}

/// Result type for fallible constructors
pub type Result<T> = std::result::Result<T, Error>;
