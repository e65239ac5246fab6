//! Snapshot store errors

use thiserror::Error;

/// Result type for snapshot store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a snapshot store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backend refused a new record because a size or record limit
    /// was reached.
    #[error("Snapshot store capacity exceeded: limit of {limit} records reached")]
    CapacityExceeded { limit: usize },
}
