//! CommitFailed - rejection raised by commit hooks

use std::fmt;

use thiserror::Error;

/// Category of a hook rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFailedKind {
    /// Unresolved conflicts between concurrent changes
    Conflict,
    /// A content constraint was violated
    Constraint,
    /// The committing party lacks permission
    Access,
    /// Anything else
    Other,
}

impl CommitFailedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitFailedKind::Conflict => "Conflict",
            CommitFailedKind::Constraint => "Constraint",
            CommitFailedKind::Access => "Access",
            CommitFailedKind::Other => "Other",
        }
    }
}

impl fmt::Display for CommitFailedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A commit hook declined the change set.
///
/// Displayed as `<Kind><code:04>: <message>`, e.g. `Conflict0001: ...`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{code:04}: {message}")]
pub struct CommitFailed {
    kind: CommitFailedKind,
    code: u32,
    message: String,
}

impl CommitFailed {
    pub fn new(kind: CommitFailedKind, code: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: u32, message: impl Into<String>) -> Self {
        Self::new(CommitFailedKind::Conflict, code, message)
    }

    pub fn constraint(code: u32, message: impl Into<String>) -> Self {
        Self::new(CommitFailedKind::Constraint, code, message)
    }

    pub fn access(code: u32, message: impl Into<String>) -> Self {
        Self::new(CommitFailedKind::Access, code, message)
    }

    pub fn kind(&self) -> CommitFailedKind {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == CommitFailedKind::Conflict
    }
}
