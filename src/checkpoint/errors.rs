//! Checkpoint error types
//!
//! Checkpoint errors are ERROR severity and never fatal: a failed
//! checkpoint leaves the published content untouched.

use std::fmt;

use crate::observability::Severity;
use crate::scheduler::Interrupted;
use crate::store::StoreError;

/// Checkpoint error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointErrorCode {
    /// Lifetime must be positive
    CanopyCheckpointInvalidLifetime,
    /// Write permit not acquired within the configured wait
    CanopyCheckpointLockTimeout,
    /// Wait for the write permit was cancelled
    CanopyCheckpointInterrupted,
    /// Head moved between refresh and publish
    CanopyCheckpointConcurrentUpdate,
    /// Snapshot store refused the write
    CanopyCheckpointStoreFailed,
}

impl CheckpointErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointErrorCode::CanopyCheckpointInvalidLifetime => {
                "CANOPY_CHECKPOINT_INVALID_LIFETIME"
            }
            CheckpointErrorCode::CanopyCheckpointLockTimeout => "CANOPY_CHECKPOINT_LOCK_TIMEOUT",
            CheckpointErrorCode::CanopyCheckpointInterrupted => "CANOPY_CHECKPOINT_INTERRUPTED",
            CheckpointErrorCode::CanopyCheckpointConcurrentUpdate => {
                "CANOPY_CHECKPOINT_CONCURRENT_UPDATE"
            }
            CheckpointErrorCode::CanopyCheckpointStoreFailed => "CANOPY_CHECKPOINT_STORE_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for CheckpointErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
enum CheckpointCause {
    Store(StoreError),
    Interrupted(Interrupted),
}

/// Checkpoint error with full context
#[derive(Debug)]
pub struct CheckpointError {
    code: CheckpointErrorCode,
    message: String,
    source: Option<CheckpointCause>,
}

impl CheckpointError {
    fn new(code: CheckpointErrorCode, message: impl Into<String>, source: Option<CheckpointCause>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn invalid_lifetime() -> Self {
        Self::new(
            CheckpointErrorCode::CanopyCheckpointInvalidLifetime,
            "checkpoint lifetime must be > 0",
            None,
        )
    }

    pub fn lock_timeout(name: &str, waited_ms: u128) -> Self {
        Self::new(
            CheckpointErrorCode::CanopyCheckpointLockTimeout,
            format!("Failed to create checkpoint {} in {} ms", name, waited_ms),
            None,
        )
    }

    pub fn concurrent_update(name: &str) -> Self {
        Self::new(
            CheckpointErrorCode::CanopyCheckpointConcurrentUpdate,
            format!("Head moved while creating checkpoint {}", name),
            None,
        )
    }

    pub fn store_failed(source: StoreError) -> Self {
        Self::new(
            CheckpointErrorCode::CanopyCheckpointStoreFailed,
            format!("Snapshot store refused checkpoint: {}", source),
            Some(CheckpointCause::Store(source)),
        )
    }

    pub fn code(&self) -> CheckpointErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Checkpoint errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(CheckpointCause::Store(e)) => Some(e),
            Some(CheckpointCause::Interrupted(e)) => Some(e),
            None => None,
        }
    }
}

impl From<Interrupted> for CheckpointError {
    fn from(cause: Interrupted) -> Self {
        Self::new(
            CheckpointErrorCode::CanopyCheckpointInterrupted,
            "Checkpoint creation interrupted",
            Some(CheckpointCause::Interrupted(cause)),
        )
    }
}

impl From<StoreError> for CheckpointError {
    fn from(cause: StoreError) -> Self {
        Self::store_failed(cause)
    }
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CheckpointErrorCode::CanopyCheckpointLockTimeout.as_str(),
            "CANOPY_CHECKPOINT_LOCK_TIMEOUT"
        );
        assert_eq!(
            CheckpointErrorCode::CanopyCheckpointConcurrentUpdate.as_str(),
            "CANOPY_CHECKPOINT_CONCURRENT_UPDATE"
        );
    }

    #[test]
    fn test_display_contains_required_fields() {
        let err = CheckpointError::lock_timeout("cp-1", 10_000);
        let display = err.to_string();
        assert!(display.contains("ERROR"));
        assert!(display.contains("CANOPY_CHECKPOINT_LOCK_TIMEOUT"));
        assert!(display.contains("cp-1"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_interrupted_conversion() {
        let err = CheckpointError::from(Interrupted);
        assert_eq!(err.code(), CheckpointErrorCode::CanopyCheckpointInterrupted);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_store_failure_keeps_source() {
        let err = CheckpointError::from(StoreError::CapacityExceeded { limit: 1 });
        assert_eq!(err.code(), CheckpointErrorCode::CanopyCheckpointStoreFailed);
        assert!(err.source().is_some());
    }
}
