//! Progress summaries derived from a [`ProgressMap`].

use serde::{Deserialize, Serialize};

use crate::record::{timestamp, ProgressMap};
use crate::tutorial::TutorialId;
use crate::Time;

/// Rounded completion percentage, 0..=100.
///
/// Halves round up, so 1 of 8 reports 13.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}

/// Number of recognized tutorials marked complete.
pub fn completed_count(progress: &ProgressMap) -> usize {
    TutorialId::ALL
        .iter()
        .filter(|id| progress.get(id).is_some_and(|r| r.completed))
        .count()
}

/// Full progress report across every tutorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// Number of recognized tutorials
    pub total_tutorials: usize,

    /// Number completed
    pub completed: usize,

    /// Rounded completion percentage
    pub percentage: u8,

    /// Per-tutorial details, in presentation order
    pub details: Vec<TutorialDetail>,
}

/// Report line for one tutorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialDetail {
    /// Tutorial described
    pub tutorial: TutorialId,
    /// Marked complete
    pub completed: bool,
    /// Visits, including counted completions
    pub visits: u32,
    /// First page visit
    #[serde(with = "timestamp::option")]
    pub first_visited: Option<Time>,
    /// Most recent page visit
    #[serde(with = "timestamp::option")]
    pub last_visited: Option<Time>,
    /// When it was marked complete
    #[serde(with = "timestamp::option")]
    pub completed_at: Option<Time>,
}

impl ProgressReport {
    /// Build a report; tutorials without a record show up with defaults.
    pub fn from_progress(progress: &ProgressMap) -> Self {
        let details = TutorialId::ALL
            .iter()
            .map(|id| {
                let record = progress.get(id).cloned().unwrap_or_default();
                TutorialDetail {
                    tutorial: *id,
                    completed: record.completed,
                    visits: record.visits,
                    first_visited: record.first_visited,
                    last_visited: record.last_visited,
                    completed_at: record.completed_at,
                }
            })
            .collect();

        let completed = completed_count(progress);
        Self {
            total_tutorials: TutorialId::COUNT,
            completed,
            percentage: completion_percentage(completed, TutorialId::COUNT),
            details,
        }
    }
}
