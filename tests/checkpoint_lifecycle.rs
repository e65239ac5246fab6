//! Checkpoint Lifecycle Tests
//!
//! Checkpoints freeze the content root next to it in the head:
//! - a checkpoint keeps the root it was taken from across later commits
//! - expired checkpoints are hidden and swept by the next creation
//! - creation gives up when the write permit stays busy

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use canopy::checkpoint::{CheckpointError, CheckpointErrorCode};
use canopy::commit::{CommitInfo, EmptyHook};
use canopy::config::{ConfigErrorCode, CoordinatorConfig};
use canopy::scheduler::{Cancellation, CommitCoordinator};
use canopy::store::layout::CHECKPOINTS;
use canopy::store::{MemoryStore, SnapshotStore};

fn coordinator(store: &Arc<MemoryStore>) -> CommitCoordinator {
    CommitCoordinator::builder(Arc::clone(store))
        .with_maximum_backoff(Duration::from_millis(8))
        .with_checkpoints_lock_wait(Duration::from_millis(100))
        .build()
        .unwrap()
}

fn commit(coordinator: &CommitCoordinator, name: &str, value: i64) {
    let mut changes = coordinator.root().builder();
    changes.set_property(name, value);
    coordinator
        .schedule(&mut changes, &EmptyHook, &CommitInfo::new("checkpoint-tests", None))
        .unwrap();
}

// =============================================================================
// Round Trip Tests
// =============================================================================

/// A checkpoint returns the root it was taken from.
#[test]
fn test_checkpoint_freezes_root() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);

    commit(&coordinator, "v", 1);
    let frozen = coordinator.root();
    let name = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    commit(&coordinator, "v", 2);

    let restored = coordinator.retrieve(&name).unwrap();
    assert_eq!(restored.id(), frozen.id());
    assert_eq!(restored.long("v"), Some(1));
    assert_eq!(coordinator.root().long("v"), Some(2));
}

/// Commits keep existing checkpoints.
#[test]
fn test_commits_preserve_checkpoints() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);
    let name = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());

    for i in 0..5 {
        commit(&coordinator, "n", i);
    }
    assert!(store.read_head().child_node(CHECKPOINTS).has_child_node(&name));
    assert_eq!(coordinator.checkpoints(), vec![name]);
}

/// Checkpoint bookkeeping does not count as a content change.
#[test]
fn test_checkpoint_does_not_notify() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);
    let before = coordinator.change_dispatcher().unwrap().root();

    coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    assert_eq!(coordinator.change_dispatcher().unwrap().root().id(), before.id());
    assert_eq!(coordinator.metrics().snapshot().external_heads, 0);
}

/// Metadata and timestamps are readable back.
#[test]
fn test_checkpoint_info() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);
    let mut properties = BTreeMap::new();
    properties.insert("creator".to_string(), "backup".to_string());
    properties.insert("reason".to_string(), "nightly".to_string());

    let name = coordinator
        .try_checkpoint(Duration::from_secs(3600), &properties, &Cancellation::never())
        .unwrap();

    let info = coordinator.checkpoint_info(&name).unwrap();
    assert_eq!(info.name, name);
    assert_eq!(info.properties, properties);
    assert_eq!(info.expires - info.created, 3_600_000);
    assert!(coordinator.checkpoint_info("unknown").is_none());
    assert!(coordinator.retrieve("unknown").is_none());
}

// =============================================================================
// Expiry Tests
// =============================================================================

/// Expired checkpoints disappear from the listing, then from the head.
#[test]
fn test_expired_checkpoints_are_swept() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);

    let short = coordinator.checkpoint(Duration::from_millis(20), &BTreeMap::new());
    let long = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    thread::sleep(Duration::from_millis(60));

    // Hidden but still stored
    assert_eq!(coordinator.checkpoints(), vec![long.clone()]);
    assert!(coordinator.retrieve(&short).is_some());

    let newest = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    assert!(coordinator.checkpoint_info(&short).is_none());

    let mut listed = coordinator.checkpoints();
    listed.sort();
    let mut expected = vec![long, newest];
    expected.sort();
    assert_eq!(listed, expected);
    assert_eq!(coordinator.metrics().snapshot().checkpoints_expired, 1);
}

// =============================================================================
// Removal Tests
// =============================================================================

/// Removal succeeds once.
#[test]
fn test_remove_checkpoint() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);
    let name = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());

    assert!(coordinator.remove_checkpoint(&name));
    assert!(!coordinator.remove_checkpoint(&name));
    assert!(coordinator.checkpoints().is_empty());
    assert_eq!(coordinator.metrics().snapshot().checkpoints_removed, 1);
}

// =============================================================================
// Lock Wait Tests
// =============================================================================

/// Creation fails with a lock timeout while somebody holds the permit.
#[test]
fn test_lock_wait_timeout() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = Arc::new(coordinator(&store));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            coordinator
                .locked(Duration::from_secs(5), &Cancellation::never(), || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok::<bool, CheckpointError>(true)
                })
                .unwrap()
        })
    };
    entered_rx.recv().unwrap();

    let err = coordinator
        .try_checkpoint(Duration::from_secs(60), &BTreeMap::new(), &Cancellation::never())
        .unwrap_err();
    assert_eq!(err.code(), CheckpointErrorCode::CanopyCheckpointLockTimeout);

    // The swallowing variant still hands back a name, but nothing is stored
    let name = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    assert!(coordinator.checkpoint_info(&name).is_none());

    release_tx.send(()).unwrap();
    assert!(holder.join().unwrap());
    assert_eq!(coordinator.metrics().snapshot().checkpoints_failed, 2);

    // Free again
    let name = coordinator.checkpoint(Duration::from_secs(60), &BTreeMap::new());
    assert!(coordinator.checkpoint_info(&name).is_some());
}

/// A cancelled wait reports interruption.
#[test]
fn test_cancelled_checkpoint() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store);
    let cancel = Cancellation::new();
    cancel.cancel();

    let err = coordinator
        .try_checkpoint(Duration::from_secs(60), &BTreeMap::new(), &cancel)
        .unwrap_err();
    assert_eq!(err.code(), CheckpointErrorCode::CanopyCheckpointInterrupted);
}

// =============================================================================
// Configuration Tests
// =============================================================================

/// A coordinator built from a config file uses its settings.
#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("canopy.json");
    std::fs::write(
        &path,
        r#"{ "maximum_backoff_ms": 50, "checkpoints_lock_wait_secs": 2, "dispatch_changes": false }"#,
    )
    .unwrap();

    let config = CoordinatorConfig::load(&path).unwrap();
    assert_eq!(config.maximum_backoff(), Duration::from_millis(50));
    assert!(config.commit_fair_lock);

    let store = Arc::new(MemoryStore::new());
    let coordinator = CommitCoordinator::builder(Arc::clone(&store))
        .with_config(config)
        .build()
        .unwrap();
    assert!(coordinator.change_dispatcher().is_none());
    assert_eq!(coordinator.config().checkpoints_lock_wait_secs, 2);
}

/// Missing and invalid files are reported with distinct codes.
#[test]
fn test_config_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = CoordinatorConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(missing.code(), ConfigErrorCode::CanopyConfigReadFailed);

    let path = dir.path().join("zero.json");
    std::fs::write(&path, r#"{ "maximum_backoff_ms": 0 }"#).unwrap();
    let invalid = CoordinatorConfig::load(&path).unwrap_err();
    assert_eq!(invalid.code(), ConfigErrorCode::CanopyConfigInvalid);
}
