//! Names of the persisted layout inside every snapshot
//!
//! ```text
//! <snapshot>
//!   token    : STRING   (present only while a pessimistic commit lock is held)
//!   timeout  : LONG     (lock expiry, epoch millis)
//!   root/               (content tree)
//!   checkpoints/
//!     <name>/
//!       timestamp  : LONG (expiry, epoch millis)
//!       created    : LONG (epoch millis)
//!       properties/       (caller metadata, STRING values)
//!       root/             (frozen copy of the content tree)
//! ```

/// Content tree child.
pub const ROOT: &str = "root";

/// Checkpoint container child.
pub const CHECKPOINTS: &str = "checkpoints";

/// Lock token property.
pub const TOKEN: &str = "token";

/// Lock expiry property.
pub const TIMEOUT: &str = "timeout";

/// Checkpoint expiry property.
pub const TIMESTAMP: &str = "timestamp";

/// Checkpoint creation time property.
pub const CREATED: &str = "created";

/// Checkpoint metadata child.
pub const PROPERTIES: &str = "properties";
