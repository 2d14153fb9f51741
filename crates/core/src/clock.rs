//! Time sources.

use std::sync::{Arc, Mutex};

use chrono::{Duration, SubsecRound, Utc};

use crate::Time;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant, truncated to millisecond precision.
    fn now(&self) -> Time;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now().trunc_subsecs(3)
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Time>>,
}

impl ManualClock {
    /// Create a clock stopped at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: Arc::new(Mutex::new(start.trunc_subsecs(3))),
        }
    }

    /// Move the clock to `time`.
    pub fn set(&self, time: Time) {
        *self.lock() = time.trunc_subsecs(3);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now = (*now + by).trunc_subsecs(3);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Time> {
        // A poisoned clock still holds a valid instant.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        *self.lock()
    }
}
