//! Commit metadata

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::now_millis;

/// Metadata carried with a commit and handed unmodified to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Session that produced the change
    pub session_id: String,
    /// Authenticated user, if any
    pub user_id: Option<String>,
    /// Creation time, epoch millis
    pub date: i64,
    /// Free-form caller metadata
    #[serde(default)]
    pub info: BTreeMap<String, String>,
    /// Set for changes observed from other publishers
    #[serde(default)]
    pub external: bool,
}

impl CommitInfo {
    pub fn new(session_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            date: now_millis(),
            info: BTreeMap::new(),
            external: false,
        }
    }

    /// Metadata for a head change this process did not make.
    pub fn external() -> Self {
        Self {
            session_id: String::new(),
            user_id: None,
            date: now_millis(),
            info: BTreeMap::new(),
            external: true,
        }
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn is_external(&self) -> bool {
        self.external
    }
}
