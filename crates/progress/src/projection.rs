//! Rendering of store state: progress bar, completion badges, counters and
//! completion notifications.

use abracadabra_core::{Clock, SystemClock, Time, TutorialId};
use abracadabra_storage::KeyValueStore;
use chrono::Duration;
use serde::Serialize;

use crate::tracker::ProgressStore;

/// How long a completion notification stays up.
pub const TOAST_LIFETIME_MS: i64 = 3000;

/// Number of cells in the rendered progress bar.
const BAR_CELLS: usize = 20;

/// Completion badge for one tutorial card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Tutorial the badge belongs to
    pub tutorial: TutorialId,
    /// Card title
    pub title: &'static str,
    /// Whether the badge shows as completed
    pub completed: bool,
}

/// Everything the hub page shows about progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    /// Rounded completion percentage
    pub percentage: u8,
    /// One badge per tutorial, in presentation order
    pub badges: Vec<Badge>,
    /// Completed tutorials
    pub completed_count: usize,
    /// All tutorials
    pub total_count: usize,
}

impl ProgressView {
    /// Derive the view from current store state.
    pub fn from_store<S: KeyValueStore, C: Clock>(store: &ProgressStore<S, C>) -> Self {
        let badges = TutorialId::ALL
            .iter()
            .map(|id| Badge {
                tutorial: *id,
                title: id.title(),
                completed: store.is_completed(*id),
            })
            .collect();

        Self {
            percentage: store.completion_percentage(),
            badges,
            completed_count: store.completed_count(),
            total_count: TutorialId::COUNT,
        }
    }

    /// Width of the progress bar fill, e.g. `"50%"`.
    pub fn bar_width(&self) -> String {
        format!("{}%", self.percentage)
    }

    /// Plain-text rendering for terminals.
    pub fn render(&self) -> String {
        let filled = usize::from(self.percentage) * BAR_CELLS / 100;
        let mut out = format!(
            "Progress [{}{}] {}\n",
            "#".repeat(filled),
            "-".repeat(BAR_CELLS - filled),
            self.bar_width()
        );
        out.push_str(&format!(
            "Completed {} of {}\n",
            self.completed_count, self.total_count
        ));
        for badge in &self.badges {
            let mark = if badge.completed { 'x' } else { ' ' };
            out.push_str(&format!("  [{}] {}\n", mark, badge.title));
        }
        out
    }
}

/// Transient "tutorial completed" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Completed tutorial
    pub tutorial: TutorialId,
    /// Text shown to the user
    pub message: String,
    /// When it appeared
    pub shown_at: Time,
    /// When it is dismissed
    pub expires_at: Time,
}

impl Toast {
    /// Notification for completing `tutorial` at `now`.
    pub fn completed(tutorial: TutorialId, now: Time) -> Self {
        Self {
            tutorial,
            message: format!("Completed: {}", tutorial.title()),
            shown_at: now,
            expires_at: now + Duration::milliseconds(TOAST_LIFETIME_MS),
        }
    }

    /// Whether the toast should have been dismissed by `now`.
    pub fn is_expired(&self, now: Time) -> bool {
        now >= self.expires_at
    }
}

/// Currently displayed notifications. Expired ones are dropped on
/// [`prune`](Self::prune).
#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
}

impl ToastQueue {
    /// Show a toast.
    pub fn push(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    /// Dismiss toasts that expired by `now`.
    pub fn prune(&mut self, now: Time) {
        self.toasts.retain(|t| !t.is_expired(now));
    }

    /// Toasts still visible at `now`, oldest first.
    pub fn active(&self, now: Time) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().filter(move |t| !t.is_expired(now))
    }

    /// Number of queued toasts, expired or not.
    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Binds a [`ProgressStore`] to its rendered view.
///
/// All mutations go through here so the view is re-derived after each one.
pub struct ProgressUi<S: KeyValueStore, C: Clock = SystemClock> {
    store: ProgressStore<S, C>,
    view: ProgressView,
    toasts: ToastQueue,
}

impl<S: KeyValueStore, C: Clock> ProgressUi<S, C> {
    /// Wrap a loaded store.
    pub fn new(store: ProgressStore<S, C>) -> Self {
        let view = ProgressView::from_store(&store);
        Self {
            store,
            view,
            toasts: ToastQueue::default(),
        }
    }

    /// Page visit.
    pub async fn visit(&mut self, tutorial: TutorialId) {
        self.store.track_visit(tutorial).await;
        self.refresh();
    }

    /// "Mark as complete" button. Returns the notification shown, or `None`
    /// when the store ignored a repeat completion.
    pub async fn mark_complete(&mut self, tutorial: TutorialId) -> Option<Toast> {
        self.store.mark_completed(tutorial).await?;
        self.refresh();

        let now = self.store.clock().now();
        self.toasts.prune(now);
        let toast = Toast::completed(tutorial, now);
        self.toasts.push(toast.clone());
        Some(toast)
    }

    /// Clear all progress.
    pub async fn reset(&mut self) {
        self.store.reset().await;
        self.refresh();
    }

    /// Current view.
    pub fn view(&self) -> &ProgressView {
        &self.view
    }

    /// Notifications still visible now; expired ones are dismissed.
    pub fn toasts(&mut self) -> Vec<Toast> {
        let now = self.store.clock().now();
        self.toasts.prune(now);
        self.toasts.active(now).cloned().collect()
    }

    /// Underlying store.
    pub fn store(&self) -> &ProgressStore<S, C> {
        &self.store
    }

    /// Underlying store, for subscribing listeners.
    pub fn store_mut(&mut self) -> &mut ProgressStore<S, C> {
        &mut self.store
    }

    fn refresh(&mut self) {
        self.view = ProgressView::from_store(&self.store);
    }
}
