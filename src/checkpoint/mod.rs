//! Checkpoints
//!
//! A checkpoint freezes the content root under `checkpoints/<name>/root`
//! of the published head, next to its expiry (`timestamp`), creation time
//! and caller metadata. Checkpoints are written under the same write
//! permit as commits, so a checkpoint never interleaves with a merge.
//!
//! Creating a checkpoint also sweeps every checkpoint whose expiry is
//! missing or past, in the same publish. Listing hides expired entries;
//! `retrieve` and `checkpoint_info` do not check expiry.

mod errors;
mod info;
mod manager;

pub use errors::{CheckpointError, CheckpointErrorCode, CheckpointResult};
pub use info::CheckpointInfo;
