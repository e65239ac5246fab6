//! Observability for the commit coordinator
//!
//! - Structured JSON logging with typed events
//! - Commit and checkpoint statistics
//! - Begin/complete scopes around long operations
//!
//! Observability is read-only: nothing here influences scheduling
//! decisions, and a failure to write a log line never fails a commit.
//!
//! ```ignore
//! use canopy::observability::{Event, Logger, MetricsRegistry};
//!
//! Logger::event(Event::CommitMerged, &[("head", "3fa4c1")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_escalations();
//! println!("{}", metrics.to_json());
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;
