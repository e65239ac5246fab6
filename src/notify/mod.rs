//! Change notification
//!
//! The coordinator reports every new content root it observes to a
//! [`ChangeNotifier`]: roots it published itself, and roots published by
//! somebody else that a head refresh discovered. The stock notifier is
//! [`ChangeDispatcher`], which fans changes out to registered observers
//! as `(before, after, info)` triples.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::commit::CommitInfo;
use crate::tree::NodeState;

/// Sink for content changes. Called synchronously after a publish.
pub trait ChangeNotifier: Send + Sync {
    fn content_changed(&self, root: &NodeState, info: &CommitInfo);
}

/// Receives `(before, after, info)` for every dispatched change.
pub trait Observer: Send + Sync {
    fn content_changed(&self, before: &NodeState, after: &NodeState, info: &CommitInfo);
}

impl<F> Observer for F
where
    F: Fn(&NodeState, &NodeState, &CommitInfo) + Send + Sync,
{
    fn content_changed(&self, before: &NodeState, after: &NodeState, info: &CommitInfo) {
        self(before, after, info)
    }
}

/// Handle returned by [`ChangeDispatcher::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Fans content changes out to observers.
///
/// Observers are called while the dispatcher lock is held, so they see
/// changes in publish order and must not call back into the dispatcher.
pub struct ChangeDispatcher {
    inner: Mutex<DispatcherInner>,
}

struct DispatcherInner {
    root: NodeState,
    observers: BTreeMap<ObserverId, Box<dyn Observer>>,
    next_id: u64,
}

impl ChangeDispatcher {
    pub fn new(root: NodeState) -> Self {
        Self {
            inner: Mutex::new(DispatcherInner {
                root,
                observers: BTreeMap::new(),
                next_id: 0,
            }),
        }
    }

    pub fn add_observer(&self, observer: impl Observer + 'static) -> ObserverId {
        let mut inner = self.lock();
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        inner.observers.insert(id, Box::new(observer));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.lock().observers.remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Last root passed to observers.
    pub fn root(&self) -> NodeState {
        self.lock().root.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DispatcherInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChangeNotifier for ChangeDispatcher {
    fn content_changed(&self, root: &NodeState, info: &CommitInfo) {
        let mut inner = self.lock();
        if NodeState::fast_equals(&inner.root, root) {
            return;
        }
        let before = std::mem::replace(&mut inner.root, root.clone());
        for observer in inner.observers.values() {
            observer.content_changed(&before, root, info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn with_value(value: i64) -> NodeState {
        let mut builder = NodeState::empty().builder();
        builder.set_property("v", value);
        builder.node_state()
    }

    #[test]
    fn test_observers_see_before_and_after() {
        let dispatcher = ChangeDispatcher::new(NodeState::empty());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_observer(move |before: &NodeState, after: &NodeState, _: &CommitInfo| {
            sink.lock()
                .unwrap()
                .push((before.long("v"), after.long("v")));
        });

        let info = CommitInfo::new("s", None);
        dispatcher.content_changed(&with_value(1), &info);
        dispatcher.content_changed(&with_value(2), &info);

        assert_eq!(*seen.lock().unwrap(), vec![(None, Some(1)), (Some(1), Some(2))]);
    }

    #[test]
    fn test_unchanged_root_is_not_dispatched() {
        let root = with_value(1);
        let dispatcher = ChangeDispatcher::new(root.clone());
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        dispatcher.add_observer(move |_: &NodeState, _: &NodeState, _: &CommitInfo| {
            *sink.lock().unwrap() += 1;
        });

        dispatcher.content_changed(&root, &CommitInfo::external());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_remove_observer() {
        let dispatcher = ChangeDispatcher::new(NodeState::empty());
        let id = dispatcher.add_observer(|_: &NodeState, _: &NodeState, _: &CommitInfo| {});
        assert_eq!(dispatcher.observer_count(), 1);
        assert!(dispatcher.remove_observer(id));
        assert!(!dispatcher.remove_observer(id));
        assert_eq!(dispatcher.observer_count(), 0);
    }
}
