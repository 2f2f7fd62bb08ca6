use thiserror::Error;

/// All errors produced by peekring-core.
///
/// Partial transfers are not represented here: `write`, `read` and `skip`
/// report short counts through their plain return value, and a short count
/// is the expected outcome under backpressure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("ring capacity of {requested} bytes is not usable")]
    InvalidCapacity { requested: usize },

    #[error("ring allocation of {capacity} + 1 bytes failed")]
    AllocationFailure { capacity: usize },

    #[error("peek of {requested} bytes exceeds the {available} available")]
    InsufficientData { requested: usize, available: usize },

    #[error("no saved read position")]
    NoSaveState,

    #[error("offset of {requested} bytes exceeds the reachable {limit}")]
    BoundsExceeded { requested: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, RingError>;
