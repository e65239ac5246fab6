//! CommitCoordinator construction and head management

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::commit::CommitInfo;
use crate::config::{ConfigError, ConfigResult, CoordinatorConfig};
use crate::notify::{ChangeDispatcher, ChangeNotifier};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::store::layout::ROOT;
use crate::store::{SnapshotStore, StoreResult};
use crate::tree::NodeState;

use super::permit::WritePermit;

/// Single-writer commit scheduler over a shared snapshot store.
///
/// Within one coordinator, commits and checkpoint operations are
/// serialized by a write permit. Across coordinators (or any other
/// publisher sharing the store) the only coordination is the store's
/// compare-and-swap plus the lock token persisted in the head snapshot.
pub struct CommitCoordinator {
    pub(super) store: Arc<dyn SnapshotStore>,
    head: RwLock<NodeState>,
    pub(crate) permit: WritePermit,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    dispatcher: Option<Arc<ChangeDispatcher>>,
    pub(crate) metrics: Arc<MetricsRegistry>,
    pub(super) maximum_backoff: Duration,
    pub(crate) checkpoints_lock_wait: Duration,
    config: CoordinatorConfig,
}

pub struct CoordinatorBuilder {
    store: Arc<dyn SnapshotStore>,
    config: CoordinatorConfig,
    metrics: Option<Arc<MetricsRegistry>>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    maximum_backoff: Option<Duration>,
    checkpoints_lock_wait: Option<Duration>,
}

impl CoordinatorBuilder {
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a registry, e.g. between coordinators of one process.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replaces the default `ChangeDispatcher`.
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn dispatch_changes(mut self, enabled: bool) -> Self {
        self.config.dispatch_changes = enabled;
        self
    }

    /// Overrides `maximum_backoff_ms` with sub-config precision.
    pub fn with_maximum_backoff(mut self, backoff: Duration) -> Self {
        self.maximum_backoff = Some(backoff);
        self
    }

    /// Overrides `checkpoints_lock_wait_secs` with sub-second precision.
    pub fn with_checkpoints_lock_wait(mut self, wait: Duration) -> Self {
        self.checkpoints_lock_wait = Some(wait);
        self
    }

    pub fn build(self) -> ConfigResult<CommitCoordinator> {
        self.config.validate()?;
        let maximum_backoff = self
            .maximum_backoff
            .unwrap_or_else(|| self.config.maximum_backoff());
        let checkpoints_lock_wait = self
            .checkpoints_lock_wait
            .unwrap_or_else(|| self.config.checkpoints_lock_wait());
        if maximum_backoff.is_zero() {
            return Err(ConfigError::invalid("maximum backoff must be > 0"));
        }
        if checkpoints_lock_wait.is_zero() {
            return Err(ConfigError::invalid("checkpoints lock wait must be > 0"));
        }

        let head = self.store.read_head();
        let (notifier, dispatcher) = match self.notifier {
            Some(notifier) => (Some(notifier), None),
            None if self.config.dispatch_changes => {
                let dispatcher = Arc::new(ChangeDispatcher::new(head.child_node(ROOT)));
                let notifier: Arc<dyn ChangeNotifier> = dispatcher.clone();
                (Some(notifier), Some(dispatcher))
            }
            None => (None, None),
        };

        let head_id = head.id().short();
        let backoff_ms = maximum_backoff.as_millis().to_string();
        let lock_wait_ms = checkpoints_lock_wait.as_millis().to_string();
        Logger::event(
            Event::CoordinatorInit,
            &[
                ("head", head_id.as_str()),
                ("fair", if self.config.commit_fair_lock { "true" } else { "false" }),
                ("maximum_backoff_ms", backoff_ms.as_str()),
                ("checkpoints_lock_wait_ms", lock_wait_ms.as_str()),
            ],
        );

        Ok(CommitCoordinator {
            store: self.store,
            head: RwLock::new(head),
            permit: WritePermit::new(self.config.commit_fair_lock),
            notifier,
            dispatcher,
            metrics: self.metrics.unwrap_or_default(),
            maximum_backoff,
            checkpoints_lock_wait,
            config: self.config,
        })
    }
}

impl CommitCoordinator {
    pub fn builder<S>(store: Arc<S>) -> CoordinatorBuilder
    where
        S: SnapshotStore + 'static,
    {
        CoordinatorBuilder {
            store,
            config: CoordinatorConfig::default(),
            metrics: None,
            notifier: None,
            maximum_backoff: None,
            checkpoints_lock_wait: None,
        }
    }

    /// Best-effort current head.
    ///
    /// Refreshes from the store only if the write permit is free right
    /// now; otherwise returns the cached, possibly stale, head. Never
    /// blocks on a running commit.
    pub fn head(&self) -> NodeState {
        if let Some(_guard) = self.permit.try_acquire() {
            self.refresh_head(true);
        }
        self.cached_head()
    }

    /// Content root of [`head`](Self::head).
    pub fn root(&self) -> NodeState {
        self.head().child_node(ROOT)
    }

    pub fn change_dispatcher(&self) -> Option<&Arc<ChangeDispatcher>> {
        self.dispatcher.as_ref()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub(crate) fn cached_head(&self) -> NodeState {
        self.head
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if the cache changed.
    fn replace_head(&self, state: NodeState) -> bool {
        let mut head = self.head.write().unwrap_or_else(PoisonError::into_inner);
        if head.id() == state.id() {
            return false;
        }
        *head = state;
        true
    }

    /// Reloads the cache from the store. With `dispatch`, a head somebody
    /// else published is reported to the notifier as an external change.
    pub(crate) fn refresh_head(&self, dispatch: bool) {
        let state = self.store.read_head();
        if !self.replace_head(state.clone()) || !dispatch {
            return;
        }
        self.metrics.increment_external_heads();
        let head_id = state.id().short();
        Logger::event(Event::HeadExternalChange, &[("head", head_id.as_str())]);
        self.content_changed(&state.child_node(ROOT), &CommitInfo::external());
    }

    /// Publishes `after` if the head is still `before`.
    ///
    /// On success the cache moves to `after` and the notifier sees the
    /// new content root. A lost race returns `Ok(false)`.
    pub(super) fn set_head(
        &self,
        before: &NodeState,
        after: &NodeState,
        info: &CommitInfo,
    ) -> StoreResult<bool> {
        self.refresh_head(true);
        let id = self.store.write(after)?;
        if !self.store.compare_and_swap(&before.id(), &id) {
            return Ok(false);
        }
        self.replace_head(after.clone());
        self.content_changed(&after.child_node(ROOT), info);
        self.refresh_head(true);
        Ok(true)
    }

    /// Publishes without notifying. Used for lock tokens and checkpoint
    /// bookkeeping, neither of which changes the content root.
    pub(crate) fn swap_head(&self, before: &NodeState, after: &NodeState) -> StoreResult<bool> {
        let id = self.store.write(after)?;
        if !self.store.compare_and_swap(&before.id(), &id) {
            return Ok(false);
        }
        self.refresh_head(false);
        Ok(true)
    }

    fn content_changed(&self, root: &NodeState, info: &CommitInfo) {
        if let Some(notifier) = &self.notifier {
            notifier.content_changed(root, info);
        }
    }
}
