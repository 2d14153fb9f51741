//! Per-tutorial progress record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tutorial::TutorialId;
use crate::Time;

/// Visit and completion metadata for a single tutorial.
///
/// A tutorial without a record behaves exactly like one holding
/// `ProgressRecord::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Whether the tutorial was marked complete
    #[serde(default)]
    pub completed: bool,

    /// When it was (last) marked complete
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub completed_at: Option<Time>,

    /// Number of recorded visits
    #[serde(default)]
    pub visits: u32,

    /// First recorded visit
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub first_visited: Option<Time>,

    /// Most recent recorded visit
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub last_visited: Option<Time>,
}

impl ProgressRecord {
    /// Record a visit at `now`.
    pub fn visit(&mut self, now: Time) {
        self.visits = self.visits.saturating_add(1);
        self.last_visited = Some(now);
        if self.first_visited.is_none() {
            self.first_visited = Some(now);
        }
    }

    /// Mark the tutorial completed at `now`.
    ///
    /// Every completion counts as a visit unless `count_repeat` is false and
    /// the record was already complete. Returns whether the record changed.
    pub fn complete(&mut self, now: Time, count_repeat: bool) -> bool {
        if self.completed && self.completed_at.is_some() && !count_repeat {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(now);
        self.visits = self.visits.saturating_add(1);
        true
    }

    /// Restore the record invariants on data written elsewhere: a completion
    /// needs a completion time, and a visit time needs at least one visit.
    ///
    /// Returns whether anything had to change.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;
        if self.completed && self.completed_at.is_none() {
            self.completed = false;
            changed = true;
        }
        if self.visits == 0 && (self.first_visited.is_some() || self.last_visited.is_some()) {
            self.visits = 1;
            changed = true;
        }
        changed
    }
}

/// Progress of every tutorial that has a record.
pub type ProgressMap = BTreeMap<TutorialId, ProgressRecord>;

/// Timestamps are stored the way browsers print them:
/// RFC 3339, millisecond precision, `Z` suffix.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};

    /// Format a timestamp for storage.
    pub fn format(time: &DateTime<Utc>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Optional variant, `null` maps to `None`.
    pub mod option {
        use chrono::{DateTime, SubsecRound, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize an optional timestamp.
        pub fn serialize<S: Serializer>(
            time: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&super::format(t)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize an optional timestamp, truncated to milliseconds so it
        /// saves back unchanged.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc).trunc_subsecs(3))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}
