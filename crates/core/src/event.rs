//! Change notifications emitted by the progress store.

use serde::{Deserialize, Serialize};

use crate::record::ProgressRecord;
use crate::tutorial::TutorialId;

/// Something changed in the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A tutorial page was visited.
    Visited {
        /// Visited tutorial
        tutorial: TutorialId,
        /// Record after the visit
        record: ProgressRecord,
    },

    /// A tutorial was marked complete.
    Completed {
        /// Completed tutorial
        tutorial: TutorialId,
        /// Record after completion
        record: ProgressRecord,
    },

    /// All progress was cleared.
    Reset,
}

impl ProgressEvent {
    /// Tutorial affected by this event, if any.
    pub fn tutorial(&self) -> Option<TutorialId> {
        match self {
            ProgressEvent::Visited { tutorial, .. } | ProgressEvent::Completed { tutorial, .. } => {
                Some(*tutorial)
            }
            ProgressEvent::Reset => None,
        }
    }
}
