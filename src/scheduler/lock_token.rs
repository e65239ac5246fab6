//! Persisted commit lock
//!
//! The pessimistic phase locks the head by publishing a snapshot whose
//! top-level node carries `token` (a fresh UUID) and `timeout` (expiry in
//! epoch millis). The lock is live while `timeout >= now`; an expired or
//! missing timeout means the lock is free and may be taken over. Lock
//! transitions are ordinary CAS publishes, so they race like any commit.

use std::time::Duration;

use uuid::Uuid;

use crate::store::layout::{TIMEOUT, TOKEN};
use crate::tree::{NodeBuilder, NodeState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    token: String,
    timeout: i64,
}

impl LockToken {
    /// A fresh token expiring `lease` after `now`.
    pub fn issue(now: i64, lease: Duration) -> Self {
        let lease_ms = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);
        Self {
            token: Uuid::new_v4().to_string(),
            timeout: now.saturating_add(lease_ms),
        }
    }

    /// Token stored on `head`, if any. A token without a readable
    /// timeout reads as already expired.
    pub fn read(head: &NodeState) -> Option<Self> {
        let token = head.string(TOKEN)?;
        Some(Self {
            token: token.to_string(),
            timeout: head.long(TIMEOUT).unwrap_or(0),
        })
    }

    /// Token on `head` that is still live at `now`.
    pub fn live(head: &NodeState, now: i64) -> Option<Self> {
        Self::read(head).filter(|token| token.is_live(now))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn timeout(&self) -> i64 {
        self.timeout
    }

    pub fn is_live(&self, now: i64) -> bool {
        self.timeout >= now
    }

    /// Time left until expiry, zero once expired.
    pub fn remaining(&self, now: i64) -> Duration {
        let left = self.timeout.saturating_sub(now).max(0);
        Duration::from_millis(u64::try_from(left).unwrap_or(0))
    }

    pub fn stage(&self, builder: &mut NodeBuilder) {
        builder
            .set_property(TOKEN, self.token.as_str())
            .set_property(TIMEOUT, self.timeout);
    }

    pub fn clear(builder: &mut NodeBuilder) {
        builder.remove_property(TOKEN);
        builder.remove_property(TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_read() {
        let token = LockToken::issue(1_000, Duration::from_millis(500));
        assert_eq!(token.timeout(), 1_500);

        let mut builder = NodeState::empty().builder();
        token.stage(&mut builder);
        let head = builder.node_state();

        assert_eq!(LockToken::read(&head), Some(token.clone()));
        assert!(LockToken::live(&head, 1_500).is_some());
        assert!(LockToken::live(&head, 1_501).is_none());
    }

    #[test]
    fn test_clear_restores_unlocked_state() {
        let base = NodeState::empty();
        let mut builder = base.builder();
        LockToken::issue(0, Duration::from_secs(1)).stage(&mut builder);
        LockToken::clear(&mut builder);
        assert!(NodeState::fast_equals(&builder.node_state(), &base));
    }

    #[test]
    fn test_token_without_timeout_is_expired() {
        let mut builder = NodeState::empty().builder();
        builder.set_property(TOKEN, "abc");
        let head = builder.node_state();
        assert!(LockToken::read(&head).is_some());
        assert!(LockToken::live(&head, 1).is_none());
    }

    #[test]
    fn test_lease_saturates() {
        let token = LockToken::issue(i64::MAX - 10, Duration::from_secs(60));
        assert_eq!(token.timeout(), i64::MAX);
    }

    #[test]
    fn test_remaining() {
        let token = LockToken::issue(100, Duration::from_millis(50));
        assert_eq!(token.remaining(120), Duration::from_millis(30));
        assert_eq!(token.remaining(500), Duration::ZERO);
    }
}
