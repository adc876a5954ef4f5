//! Document version history for folio.
//!
//! A [`SnapshotStore`] keeps, per document, a newest-first list of full-text
//! snapshots:
//! - AUTO snapshots come from the auto-capture timer and are bounded by a
//!   per-document cap and an age-based cleanup horizon
//! - MILESTONE snapshots are pinned by the user and never evicted
//!
//! Restoring a snapshot hands its content back without changing the history.

pub mod clock;
pub mod diff;
pub mod error;
pub mod policy;
mod scheduler;
pub mod snapshot;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::unified_diff;
pub use error::{SnapshotError, SnapshotResult};
pub use policy::{CleanupHorizon, RetentionPolicy, TriggerMode};
pub use snapshot::{DocumentId, Snapshot, SnapshotId, SnapshotKind};
pub use store::{HistoryStats, PersistedHistory, SnapshotStore, TickOutcome};
