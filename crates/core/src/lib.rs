//! Abracadabra core data models.
//!
//! This crate defines the tutorial catalogue and the per-tutorial progress
//! records that the progress store persists.

#![warn(missing_docs)]

// Identities
mod id;
mod tutorial;

// Progress data
mod record;
mod report;
mod event;

// Time
mod clock;

// Re-exports
pub use id::*;
pub use tutorial::{TutorialId, UnknownTutorial};
pub use record::{timestamp, ProgressMap, ProgressRecord};
pub use report::{completed_count, completion_percentage, ProgressReport, TutorialDetail};
pub use event::ProgressEvent;
pub use clock::{Clock, ManualClock, SystemClock};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
