//! Commit scheduler
//!
//! `CommitCoordinator` turns staged change sets into published snapshots:
//!
//! 1. No-op change sets return the current content root immediately.
//! 2. The process-local `WritePermit` admits one writer at a time.
//! 3. Optimistic phase: refresh, rebase, run the hook, CAS; on a lost
//!    race sleep with doubling backoff plus jitter.
//! 4. Pessimistic phase, once the backoff passes its maximum: publish a
//!    `LockToken` into the head, merge under it, and publish the result
//!    with the token removed.
//!
//! Lost CAS races are never reported. Callers see only interruption,
//! store capacity failures and hook rejections (`MergeError`).

mod cancel;
mod coordinator;
mod errors;
mod lock_token;
mod merge;
mod permit;

pub use cancel::{Cancellation, Interrupted};
pub use coordinator::{CommitCoordinator, CoordinatorBuilder};
pub use errors::{MergeError, MergeErrorCode, MergeResult};
pub use lock_token::LockToken;
pub use permit::{PermitGuard, WritePermit};
