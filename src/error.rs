//! Error types for the skip list.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by skip list operations.
///
/// A point lookup that finds nothing is not an error; it returns `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid configuration: level_count {level_count} (min 1), skip_value {skip_value} (min 2)")]
    InvalidConfig {
        level_count: usize,
        skip_value: usize,
    },

    #[error("Invalid range: low {low} is greater than high {high}")]
    InvalidRange { low: u32, high: u32 },

    #[error("Capacity exceeded: insertion needs more than {level_count} levels")]
    CapacityExceeded { level_count: usize },

    #[error("Skip list corrupted: {0}")]
    Corrupted(String),
}
