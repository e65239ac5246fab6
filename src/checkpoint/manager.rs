//! Checkpoint creation, removal and lookup on the commit coordinator

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::clock::now_millis;
use crate::observability::{Event, Logger, ObservationScope};
use crate::scheduler::{Cancellation, CommitCoordinator, Interrupted};
use crate::store::layout::{CHECKPOINTS, CREATED, PROPERTIES, ROOT, TIMESTAMP};
use crate::tree::NodeState;

use super::errors::{CheckpointError, CheckpointResult};
use super::info::{is_sweepable, CheckpointInfo};

/// Non-blocking attempts made by `remove_checkpoint`.
const REMOVE_ATTEMPTS: usize = 5;

impl CommitCoordinator {
    /// Creates a checkpoint of the current content root and returns its name.
    ///
    /// Failures are logged and counted, never returned: the generated
    /// name comes back even if nothing was written. Use
    /// [`try_checkpoint`](Self::try_checkpoint) to observe failures.
    pub fn checkpoint(&self, lifetime: Duration, properties: &BTreeMap<String, String>) -> String {
        let name = Uuid::new_v4().to_string();
        if let Err(err) = self.create_checkpoint(&name, lifetime, properties, &Cancellation::never()) {
            self.metrics.increment_checkpoints_failed();
            Logger::event(
                Event::CheckpointFailed,
                &[
                    ("name", name.as_str()),
                    ("code", err.code().as_str()),
                    ("message", err.message()),
                ],
            );
        }
        name
    }

    /// Creates a checkpoint, reporting why it could not be persisted.
    pub fn try_checkpoint(
        &self,
        lifetime: Duration,
        properties: &BTreeMap<String, String>,
        cancel: &Cancellation,
    ) -> CheckpointResult<String> {
        let name = Uuid::new_v4().to_string();
        match self.create_checkpoint(&name, lifetime, properties, cancel) {
            Ok(()) => Ok(name),
            Err(err) => {
                self.metrics.increment_checkpoints_failed();
                Err(err)
            }
        }
    }

    /// Removes checkpoint `name`.
    ///
    /// Makes a few non-blocking attempts; returns `false` if none of them
    /// both got the write permit and won the publish.
    pub fn remove_checkpoint(&self, name: &str) -> bool {
        for _ in 0..REMOVE_ATTEMPTS {
            let Some(_guard) = self.permit.try_acquire() else {
                continue;
            };
            self.refresh_head(true);
            let state = self.cached_head();
            if !state.child_node(CHECKPOINTS).has_child_node(name) {
                continue;
            }

            let mut builder = state.builder();
            builder.child(CHECKPOINTS).remove_child(name);
            if let Ok(true) = self.swap_head(&state, &builder.node_state()) {
                self.metrics.increment_checkpoints_removed();
                Logger::event(Event::CheckpointRemoved, &[("name", name)]);
                return true;
            }
        }
        false
    }

    /// Runs `body` while holding the write permit.
    ///
    /// Waits at most `timeout` for the permit and returns `Ok(false)` if it
    /// was not acquired. The cached head is refreshed before the permit is
    /// released.
    pub fn locked<F, E>(&self, timeout: Duration, cancel: &Cancellation, body: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<bool, E>,
        E: From<Interrupted>,
    {
        let Some(_guard) = self.permit.try_acquire_for(timeout, cancel)? else {
            return Ok(false);
        };
        let result = body();
        self.refresh_head(true);
        result
    }

    /// Names of all unexpired checkpoints.
    pub fn checkpoints(&self) -> Vec<String> {
        let now = now_millis();
        self.head()
            .child_node(CHECKPOINTS)
            .children()
            .filter(|(_, node)| node.long(TIMESTAMP).is_some_and(|ts| ts > now))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Metadata of checkpoint `name`, expired or not.
    pub fn checkpoint_info(&self, name: &str) -> Option<CheckpointInfo> {
        let node = self.head().child_node(CHECKPOINTS).child_node(name);
        node.exists().then(|| CheckpointInfo::from_node(name, &node))
    }

    /// Content root frozen by checkpoint `name`.
    pub fn retrieve(&self, name: &str) -> Option<NodeState> {
        let root = self
            .head()
            .child_node(CHECKPOINTS)
            .child_node(name)
            .child_node(ROOT);
        root.exists().then_some(root)
    }

    fn create_checkpoint(
        &self,
        name: &str,
        lifetime: Duration,
        properties: &BTreeMap<String, String>,
        cancel: &Cancellation,
    ) -> CheckpointResult<()> {
        if lifetime.is_zero() {
            return Err(CheckpointError::invalid_lifetime());
        }

        let scope = ObservationScope::with_fields("CHECKPOINT_CREATE", vec![("name", name.to_string())]);
        let wait = self.checkpoints_lock_wait;
        let outcome = self.locked(wait, cancel, || {
            if self.write_checkpoint(name, lifetime, properties)? {
                Ok(true)
            } else {
                Err(CheckpointError::concurrent_update(name))
            }
        });

        match outcome {
            Ok(true) => {
                self.metrics.increment_checkpoints_created();
                let lifetime_ms = lifetime.as_millis().to_string();
                scope.complete_with_fields(&[("lifetime_ms", lifetime_ms.as_str())]);
                Logger::event(
                    Event::CheckpointCreated,
                    &[("name", name), ("lifetime_ms", lifetime_ms.as_str())],
                );
                Ok(())
            }
            Ok(false) => {
                let err = CheckpointError::lock_timeout(name, wait.as_millis());
                scope.fail(err.message());
                Err(err)
            }
            Err(err) => {
                scope.fail(err.message());
                Err(err)
            }
        }
    }

    /// Sweeps expired checkpoints and adds `name`, all in one publish.
    /// Returns `Ok(false)` if the head moved in between.
    fn write_checkpoint(
        &self,
        name: &str,
        lifetime: Duration,
        properties: &BTreeMap<String, String>,
    ) -> CheckpointResult<bool> {
        self.refresh_head(true);
        let state = self.cached_head();
        let now = now_millis();

        let mut builder = state.builder();
        let checkpoints = builder.child(CHECKPOINTS);

        let expired: Vec<String> = state
            .child_node(CHECKPOINTS)
            .children()
            .filter(|(_, node)| is_sweepable(node, now))
            .map(|(name, _)| name.to_string())
            .collect();
        for old in &expired {
            checkpoints.remove_child(old);
            Logger::event(Event::CheckpointExpired, &[("name", old.as_str())]);
        }

        let lifetime_ms = i64::try_from(lifetime.as_millis()).unwrap_or(i64::MAX);
        let checkpoint = checkpoints.child(name);
        checkpoint
            .set_property(TIMESTAMP, now.saturating_add(lifetime_ms))
            .set_property(CREATED, now);
        let mut metadata = NodeState::empty().builder();
        for (key, value) in properties {
            metadata.set_property(key, value.as_str());
        }
        checkpoint.set_child_node(PROPERTIES, metadata.node_state());
        checkpoint.set_child_node(ROOT, state.child_node(ROOT));

        if !self.swap_head(&state, &builder.node_state())? {
            return Ok(false);
        }
        self.metrics.add_checkpoints_expired(expired.len() as u64);
        Ok(true)
    }
}
