//! Observable scheduler events

use std::fmt;

use super::logger::Severity;

/// Observable events of the commit coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Coordinator constructed
    CoordinatorInit,
    /// Configuration loaded from a file
    ConfigLoaded,

    // Commits
    /// Commit waiting for the write permit
    CommitQueued,
    /// Optimistic round lost a race or met a live lock
    CommitRetry,
    /// Optimistic phase gave up, switching to the persisted lock
    CommitEscalated,
    /// Persisted commit lock acquired
    CommitLockAcquired,
    /// Waiting for another party's persisted lock
    CommitLockWait,
    /// Change published
    CommitMerged,
    /// Commit failed
    CommitRejected,

    // Head
    /// Refresh observed a head published by somebody else
    HeadExternalChange,

    // Checkpoints
    /// Checkpoint persisted
    CheckpointCreated,
    /// Checkpoint creation abandoned
    CheckpointFailed,
    /// Expired checkpoint swept
    CheckpointExpired,
    /// Checkpoint removed on request
    CheckpointRemoved,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CoordinatorInit => "COORDINATOR_INIT",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CommitQueued => "COMMIT_QUEUED",
            Event::CommitRetry => "COMMIT_RETRY",
            Event::CommitEscalated => "COMMIT_ESCALATED",
            Event::CommitLockAcquired => "COMMIT_LOCK_ACQUIRED",
            Event::CommitLockWait => "COMMIT_LOCK_WAIT",
            Event::CommitMerged => "COMMIT_MERGED",
            Event::CommitRejected => "COMMIT_REJECTED",
            Event::HeadExternalChange => "HEAD_EXTERNAL_CHANGE",
            Event::CheckpointCreated => "CHECKPOINT_CREATED",
            Event::CheckpointFailed => "CHECKPOINT_FAILED",
            Event::CheckpointExpired => "CHECKPOINT_EXPIRED",
            Event::CheckpointRemoved => "CHECKPOINT_REMOVED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CommitQueued
            | Event::CommitRetry
            | Event::CommitLockWait
            | Event::CommitMerged
            | Event::HeadExternalChange
            | Event::CheckpointExpired => Severity::Trace,
            Event::CommitEscalated | Event::CommitRejected => Severity::Warn,
            Event::CheckpointFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::CoordinatorInit,
            Event::ConfigLoaded,
            Event::CommitQueued,
            Event::CommitRetry,
            Event::CommitEscalated,
            Event::CommitLockAcquired,
            Event::CommitLockWait,
            Event::CommitMerged,
            Event::CommitRejected,
            Event::HeadExternalChange,
            Event::CheckpointCreated,
            Event::CheckpointFailed,
            Event::CheckpointExpired,
            Event::CheckpointRemoved,
        ];
        for event in events {
            assert!(event.as_str().chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failure_events_are_loud() {
        assert_eq!(Event::CheckpointFailed.severity(), Severity::Error);
        assert_eq!(Event::CommitEscalated.severity(), Severity::Warn);
        assert_eq!(Event::CommitRetry.severity(), Severity::Trace);
    }
}
