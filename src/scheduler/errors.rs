//! Merge error types
//!
//! Only three failures are visible to callers of `schedule`. Lost CAS
//! races are never errors: they drive retry and escalation internally.

use std::fmt;

use crate::commit::CommitFailed;
use crate::observability::Severity;
use crate::store::StoreError;

use super::cancel::Interrupted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeErrorCode {
    /// A wait or backoff sleep was cancelled
    CanopyMergeInterrupted,
    /// The snapshot store refused a write
    CanopyMergeCapacityExceeded,
    /// The commit hook declined the change set
    CanopyMergeHookRejected,
}

impl MergeErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeErrorCode::CanopyMergeInterrupted => "CANOPY_MERGE_INTERRUPTED",
            MergeErrorCode::CanopyMergeCapacityExceeded => "CANOPY_MERGE_CAPACITY_EXCEEDED",
            MergeErrorCode::CanopyMergeHookRejected => "CANOPY_MERGE_HOOK_REJECTED",
        }
    }

    /// A failed merge leaves the published history untouched.
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for MergeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
enum MergeCause {
    Hook(CommitFailed),
    Store(StoreError),
    Interrupted(Interrupted),
}

#[derive(Debug)]
pub struct MergeError {
    code: MergeErrorCode,
    message: String,
    source: Option<MergeCause>,
}

impl MergeError {
    pub fn interrupted(cause: Interrupted) -> Self {
        Self {
            code: MergeErrorCode::CanopyMergeInterrupted,
            message: "Merge interrupted".to_string(),
            source: Some(MergeCause::Interrupted(cause)),
        }
    }

    pub fn capacity_exceeded(cause: StoreError) -> Self {
        Self {
            code: MergeErrorCode::CanopyMergeCapacityExceeded,
            message: format!("Merge failed: {}", cause),
            source: Some(MergeCause::Store(cause)),
        }
    }

    pub fn hook_rejected(cause: CommitFailed) -> Self {
        Self {
            code: MergeErrorCode::CanopyMergeHookRejected,
            message: cause.to_string(),
            source: Some(MergeCause::Hook(cause)),
        }
    }

    pub fn code(&self) -> MergeErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn is_interrupted(&self) -> bool {
        self.code == MergeErrorCode::CanopyMergeInterrupted
    }

    /// The hook's own rejection, unchanged.
    pub fn hook_failure(&self) -> Option<&CommitFailed> {
        match &self.source {
            Some(MergeCause::Hook(failed)) => Some(failed),
            _ => None,
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(MergeCause::Hook(e)) => Some(e),
            Some(MergeCause::Store(e)) => Some(e),
            Some(MergeCause::Interrupted(e)) => Some(e),
            None => None,
        }
    }
}

impl From<Interrupted> for MergeError {
    fn from(cause: Interrupted) -> Self {
        Self::interrupted(cause)
    }
}

impl From<StoreError> for MergeError {
    fn from(cause: StoreError) -> Self {
        Self::capacity_exceeded(cause)
    }
}

impl From<CommitFailed> for MergeError {
    fn from(cause: CommitFailed) -> Self {
        Self::hook_rejected(cause)
    }
}

pub type MergeResult<T> = Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_hook_rejection_is_preserved() {
        let failed = CommitFailed::conflict(1, "Unresolved conflicts in /a");
        let err = MergeError::from(failed.clone());
        assert_eq!(err.code(), MergeErrorCode::CanopyMergeHookRejected);
        assert_eq!(err.hook_failure(), Some(&failed));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("Conflict0001"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let err = MergeError::from(StoreError::CapacityExceeded { limit: 4 });
        assert_eq!(err.code().as_str(), "CANOPY_MERGE_CAPACITY_EXCEEDED");
        assert!(err.hook_failure().is_none());
    }

    #[test]
    fn test_interrupted() {
        let err = MergeError::from(Interrupted);
        assert!(err.is_interrupted());
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.to_string().starts_with("[ERROR] CANOPY_MERGE_INTERRUPTED"));
    }
}
