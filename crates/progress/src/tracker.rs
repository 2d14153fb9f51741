//! Progress store - persisted per-tutorial visit and completion state.

use abracadabra_core::{
    completed_count, completion_percentage, Clock, ProgressEvent, ProgressMap, ProgressRecord,
    ProgressReport, SubscriptionId, SystemClock, TutorialId,
};
use abracadabra_storage::KeyValueStore;
use tracing::{debug, info, warn};

/// Storage key used by the tutorial site.
pub const DEFAULT_STORAGE_KEY: &str = "abracadabra-tutorial-progress";

/// Configuration for the progress store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Key the serialized progress lives under
    pub storage_key: String,
    /// Whether completing an already completed tutorial still counts a visit
    pub count_repeat_completions: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            count_repeat_completions: true,
        }
    }
}

/// Callback invoked after a change has been persisted.
pub type Listener = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Owns the tutorial progress mapping and keeps it in sync with a
/// key-value backend.
///
/// Every mutation is a read-modify-write of the in-memory mapping followed
/// by a write of the whole mapping. Storage failures are logged and
/// swallowed: the in-memory mapping stays authoritative for the rest of
/// the session.
pub struct ProgressStore<S: KeyValueStore, C: Clock = SystemClock> {
    backend: S,
    clock: C,
    config: StoreConfig,
    progress: ProgressMap,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl<S: KeyValueStore> ProgressStore<S, SystemClock> {
    /// Open a store on `backend` using the wall clock and default
    /// configuration, loading any saved progress.
    pub async fn open(backend: S) -> Self {
        let mut store = Self::new(backend, SystemClock);
        store.load().await;
        store
    }
}

impl<S: KeyValueStore, C: Clock> ProgressStore<S, C> {
    /// Create an empty store. Call [`load`](Self::load) to pick up saved
    /// progress.
    pub fn new(backend: S, clock: C) -> Self {
        Self {
            backend,
            clock,
            config: StoreConfig::default(),
            progress: ProgressMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Clock used for timestamps.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Storage backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Give back the storage backend, dropping in-memory state.
    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Replace the in-memory mapping with what the backend holds.
    ///
    /// Missing, unreadable or malformed data yields an empty mapping.
    pub async fn load(&mut self) {
        let key = &self.config.storage_key;
        self.progress = match self.backend.get(key).await {
            Ok(Some(raw)) => parse_progress(&raw),
            Ok(None) => {
                debug!("No saved progress under {}", key);
                ProgressMap::new()
            }
            Err(e) => {
                warn!("Failed to load progress from storage: {}", e);
                ProgressMap::new()
            }
        };
        debug!("Loaded progress for {} tutorials", self.progress.len());
    }

    /// Write the whole mapping to the backend.
    ///
    /// Returns whether the write succeeded. Failures are logged, never
    /// retried.
    pub async fn save(&mut self) -> bool {
        let json = match serde_json::to_string(&self.progress) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize progress: {}", e);
                return false;
            }
        };
        match self.backend.set(&self.config.storage_key, &json).await {
            Ok(()) => {
                debug!("Saved progress ({} bytes)", json.len());
                true
            }
            Err(e) => {
                warn!("Failed to save progress to storage: {}", e);
                false
            }
        }
    }

    /// Record a visit to `tutorial`.
    pub async fn track_visit(&mut self, tutorial: TutorialId) -> ProgressRecord {
        let now = self.clock.now();
        let record = self.progress.entry(tutorial).or_default();
        record.visit(now);
        let record = record.clone();

        self.save().await;
        self.notify(&ProgressEvent::Visited {
            tutorial,
            record: record.clone(),
        });
        record
    }

    /// Mark `tutorial` completed.
    ///
    /// Each call also counts as a visit unless
    /// [`StoreConfig::count_repeat_completions`] is off, in which case a
    /// repeat completion changes nothing and returns `None` without saving
    /// or notifying.
    pub async fn mark_completed(&mut self, tutorial: TutorialId) -> Option<ProgressRecord> {
        let now = self.clock.now();
        let count_repeat = self.config.count_repeat_completions;
        let record = self.progress.entry(tutorial).or_default();
        if !record.complete(now, count_repeat) {
            debug!("Tutorial already completed: {}", tutorial);
            return None;
        }
        let record = record.clone();

        self.save().await;
        info!("Tutorial completed: {}", tutorial);
        self.notify(&ProgressEvent::Completed {
            tutorial,
            record: record.clone(),
        });
        Some(record)
    }

    /// Whether `tutorial` has been marked complete.
    pub fn is_completed(&self, tutorial: TutorialId) -> bool {
        self.progress.get(&tutorial).is_some_and(|r| r.completed)
    }

    /// Record for `tutorial`, defaulted if it was never touched.
    pub fn record(&self, tutorial: TutorialId) -> ProgressRecord {
        self.progress.get(&tutorial).cloned().unwrap_or_default()
    }

    /// All stored records.
    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    /// Number of completed tutorials.
    pub fn completed_count(&self) -> usize {
        completed_count(&self.progress)
    }

    /// Rounded percentage of tutorials completed.
    pub fn completion_percentage(&self) -> u8 {
        completion_percentage(self.completed_count(), TutorialId::COUNT)
    }

    /// Detailed report across every tutorial.
    pub fn report(&self) -> ProgressReport {
        ProgressReport::from_progress(&self.progress)
    }

    /// Forget all progress and persist the empty mapping.
    pub async fn reset(&mut self) {
        self.progress.clear();
        self.save().await;
        info!("Progress reset");
        self.notify(&ProgressEvent::Reset);
    }

    /// Register a listener for progress changes.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&self, event: &ProgressEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

/// Decode a saved blob. Anything unparseable counts as no progress; entries
/// for tutorials that no longer exist, or that fail to decode, are dropped
/// one by one.
fn parse_progress(raw: &str) -> ProgressMap {
    let entries: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed saved progress: {}", e);
            return ProgressMap::new();
        }
    };

    let mut progress = ProgressMap::new();
    for (key, value) in entries {
        let id = match key.parse::<TutorialId>() {
            Ok(id) => id,
            Err(e) => {
                warn!("Dropping saved progress: {}", e);
                continue;
            }
        };
        let mut record: ProgressRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("Dropping saved progress for {}: {}", id, e);
                continue;
            }
        };
        if record.repair() {
            warn!("Repaired inconsistent saved progress for {}", id);
        }
        progress.insert(id, record);
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use abracadabra_core::ManualClock;
    use abracadabra_storage::{MemoryStore, StorageError};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn store() -> (ProgressStore<MemoryStore, ManualClock>, ManualClock) {
        let clock = clock();
        (ProgressStore::new(MemoryStore::new(), clock.clone()), clock)
    }

    async fn reopen(
        store: ProgressStore<MemoryStore, ManualClock>,
        clock: &ManualClock,
    ) -> ProgressStore<MemoryStore, ManualClock> {
        let mut reopened = ProgressStore::new(store.into_backend(), clock.clone());
        reopened.load().await;
        reopened
    }

    /// Backend whose every call fails.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> abracadabra_storage::Result<Option<String>> {
            Err(StorageError::Other("storage disabled".into()))
        }
        async fn set(&mut self, _key: &str, _value: &str) -> abracadabra_storage::Result<()> {
            Err(StorageError::Other("storage disabled".into()))
        }
        async fn remove(&mut self, _key: &str) -> abracadabra_storage::Result<()> {
            Err(StorageError::Other("storage disabled".into()))
        }
    }

    #[tokio::test]
    async fn test_unvisited_tutorials_default() {
        let (store, _) = store();
        for id in TutorialId::ALL {
            assert!(!store.is_completed(id));
            assert_eq!(store.record(id).visits, 0);
        }
        assert_eq!(store.completion_percentage(), 0);
    }

    #[tokio::test]
    async fn test_single_visit() {
        let (mut store, clock) = store();
        let record = store.track_visit(TutorialId::NpmBasics).await;
        assert_eq!(record.visits, 1);
        assert_eq!(record.first_visited, Some(clock.now()));
        assert_eq!(record.first_visited, record.last_visited);
        assert!(!record.completed);
    }

    #[tokio::test]
    async fn test_repeated_visits() {
        let (mut store, clock) = store();
        let first = clock.now();
        for _ in 0..5 {
            store.track_visit(TutorialId::VscodeSetup).await;
            clock.advance(Duration::seconds(30));
        }
        let record = store.record(TutorialId::VscodeSetup);
        assert_eq!(record.visits, 5);
        assert_eq!(record.first_visited, Some(first));
        assert_eq!(record.last_visited, Some(first + Duration::seconds(120)));
    }

    #[tokio::test]
    async fn test_mark_completed_repeatedly() {
        let (mut store, clock) = store();
        store.track_visit(TutorialId::Troubleshooting).await;

        let first = store.mark_completed(TutorialId::Troubleshooting).await.unwrap();
        clock.advance(Duration::milliseconds(10));
        let second = store.mark_completed(TutorialId::Troubleshooting).await.unwrap();

        assert!(store.is_completed(TutorialId::Troubleshooting));
        assert!(second.completed_at >= first.completed_at);
        assert!(second.completed_at.is_some());
        // Every completion counts as a visit.
        assert_eq!(second.visits, 3);
        // Visit history survives completion.
        assert_eq!(second.first_visited, first.first_visited);
        assert!(second.first_visited.is_some());
    }

    #[tokio::test]
    async fn test_strict_completions_keep_visits() {
        let (store, clock) = store();
        let mut store = store.with_config(StoreConfig {
            count_repeat_completions: false,
            ..Default::default()
        });
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        store.subscribe(move |_| *sink.lock().unwrap() += 1);

        let first = store.mark_completed(TutorialId::EvidenceGuide).await.unwrap();
        let saved = store.backend().get(DEFAULT_STORAGE_KEY).await.unwrap();
        clock.advance(Duration::seconds(1));

        assert_eq!(store.mark_completed(TutorialId::EvidenceGuide).await, None);
        let record = store.record(TutorialId::EvidenceGuide);
        assert_eq!(record.visits, 1);
        assert_eq!(record.completed_at, first.completed_at);
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(store.backend().get(DEFAULT_STORAGE_KEY).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_completion_percentage() {
        let (mut store, _) = store();
        assert_eq!(store.completion_percentage(), 0);

        for id in &TutorialId::ALL[..4] {
            store.mark_completed(*id).await;
        }
        assert_eq!(store.completed_count(), 4);
        assert_eq!(store.completion_percentage(), 50);

        for id in &TutorialId::ALL[4..] {
            store.mark_completed(*id).await;
        }
        assert_eq!(store.completion_percentage(), 100);
    }

    #[tokio::test]
    async fn test_save_and_reload_roundtrip() {
        let (mut store, clock) = store();
        store.track_visit(TutorialId::NpmBasics).await;
        clock.advance(Duration::milliseconds(1500));
        store.mark_completed(TutorialId::NpmBasics).await;
        store.track_visit(TutorialId::DevelopmentServers).await;
        let before = store.progress().clone();

        let reopened = reopen(store, &clock).await;
        assert_eq!(reopened.progress(), &before);
        assert!(reopened.is_completed(TutorialId::NpmBasics));
    }

    #[tokio::test]
    async fn test_progress_survives_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();

        let storage = abracadabra_storage::JsonStorage::new(dir.path()).await.unwrap();
        let mut store = ProgressStore::new(storage, clock.clone());
        store.load().await;
        store.mark_completed(TutorialId::PackageJsonGuide).await;
        store.track_visit(TutorialId::NpmScriptsTutorial).await;
        let before = store.progress().clone();
        drop(store);

        let storage = abracadabra_storage::JsonStorage::new(dir.path()).await.unwrap();
        let mut store = ProgressStore::new(storage, clock);
        store.load().await;
        assert_eq!(store.progress(), &before);
    }

    #[tokio::test]
    async fn test_reset_then_load_is_empty() {
        let (mut store, clock) = store();
        store.mark_completed(TutorialId::AssignmentOverview).await;
        store.reset().await;
        assert!(store.progress().is_empty());

        let reopened = reopen(store, &clock).await;
        assert!(reopened.progress().is_empty());
        assert_eq!(reopened.completion_percentage(), 0);
    }

    #[tokio::test]
    async fn test_malformed_blob_loads_empty() {
        for raw in ["not json at all", "null", "[1, 2]", r#"{"npm-basics": {"visits": "many"}}"#] {
            let mut backend = MemoryStore::new();
            backend.set(DEFAULT_STORAGE_KEY, raw).await.unwrap();
            let mut store = ProgressStore::new(backend, clock());
            store.load().await;
            assert!(store.progress().is_empty(), "blob {raw:?} should load empty");
        }
    }

    #[tokio::test]
    async fn test_loads_browser_written_blob() {
        let raw = r#"{
            "npm-basics": {"completed": true, "completedAt": "2024-01-01T00:00:00.000Z", "visits": 3},
            "vscode-setup": {"visits": 1, "firstVisited": "2024-01-02T10:00:00.000Z", "lastVisited": "2024-01-02T10:00:00.000Z"},
            "retired-tutorial": {"visits": 9}
        }"#;
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, raw).await.unwrap();
        let store = ProgressStore::open(backend).await;

        assert_eq!(store.progress().len(), 2);
        assert!(store.is_completed(TutorialId::NpmBasics));
        assert_eq!(store.record(TutorialId::NpmBasics).visits, 3);
        assert_eq!(store.record(TutorialId::VscodeSetup).visits, 1);
        assert_eq!(store.completion_percentage(), 13);
    }

    #[tokio::test]
    async fn test_bad_entry_does_not_discard_others() {
        let raw = r#"{
            "npm-basics": {"completed": true, "completedAt": "2024-01-01T00:00:00.000Z", "visits": 3},
            "old-tutorial": {"visits": "3"},
            "vscode-setup": {"visits": "twice"}
        }"#;
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, raw).await.unwrap();
        let store = ProgressStore::open(backend).await;

        assert_eq!(store.progress().len(), 1);
        assert!(store.is_completed(TutorialId::NpmBasics));
        assert_eq!(store.record(TutorialId::NpmBasics).visits, 3);
    }

    #[tokio::test]
    async fn test_inconsistent_records_repaired_on_load() {
        let raw = r#"{
            "npm-basics": {"completed": true},
            "vscode-setup": {"visits": 0, "firstVisited": "2024-01-01T00:00:00.000Z"}
        }"#;
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, raw).await.unwrap();
        let store = ProgressStore::open(backend).await;

        let basics = store.record(TutorialId::NpmBasics);
        assert!(!basics.completed);
        assert!(basics.completed_at.is_none());
        assert!(!store.is_completed(TutorialId::NpmBasics));

        let setup = store.record(TutorialId::VscodeSetup);
        assert_eq!(setup.visits, 1);
        assert_eq!(setup.first_visited, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_sub_millisecond_blob_reloads_unchanged() {
        let raw = r#"{"npm-basics": {"visits": 1, "firstVisited": "2024-01-01T00:00:00.123456Z", "lastVisited": "2024-01-01T00:00:00.123456Z"}}"#;
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, raw).await.unwrap();
        let clock = clock();
        let mut store = ProgressStore::new(backend, clock.clone());
        store.load().await;
        let loaded = store.progress().clone();
        assert!(store.save().await);

        let reopened = reopen(store, &clock).await;
        assert_eq!(reopened.progress(), &loaded);
    }

    #[tokio::test]
    async fn test_saved_blob_layout() {
        let (mut store, _) = store();
        store.mark_completed(TutorialId::NpmBasics).await;
        let raw = store.backend().get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "npm-basics": {
                    "completed": true,
                    "completedAt": "2024-01-01T00:00:00.000Z",
                    "visits": 1
                }
            })
        );
    }

    #[tokio::test]
    async fn test_custom_storage_key() {
        let (store, _) = store();
        let mut store = store.with_config(StoreConfig {
            storage_key: "other-course".to_string(),
            ..Default::default()
        });
        store.track_visit(TutorialId::NpmBasics).await;
        assert!(store.backend().get("other-course").await.unwrap().is_some());
        assert!(store.backend().get(DEFAULT_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let mut store = ProgressStore::new(MemoryStore::new().with_quota(10), clock());
        assert!(store.save().await);

        store.mark_completed(TutorialId::NpmBasics).await;
        assert!(store.is_completed(TutorialId::NpmBasics));
        assert!(!store.save().await);
        assert_eq!(store.backend().get(DEFAULT_STORAGE_KEY).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_broken_backend_never_raises() {
        let mut store = ProgressStore::new(BrokenStore, clock());
        store.load().await;
        assert!(store.progress().is_empty());

        store.track_visit(TutorialId::NpmBasics).await;
        store.mark_completed(TutorialId::NpmBasics).await;
        assert!(store.is_completed(TutorialId::NpmBasics));
        assert_eq!(store.record(TutorialId::NpmBasics).visits, 2);
        store.reset().await;
        assert!(store.progress().is_empty());
    }

    #[tokio::test]
    async fn test_listeners_receive_events_until_unsubscribed() {
        let (mut store, _) = store();
        let seen: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        store.track_visit(TutorialId::NpmBasics).await;
        store.mark_completed(TutorialId::NpmBasics).await;
        store.reset().await;

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.track_visit(TutorialId::NpmBasics).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], ProgressEvent::Visited { tutorial: TutorialId::NpmBasics, .. }));
        match &seen[1] {
            ProgressEvent::Completed { tutorial, record } => {
                assert_eq!(*tutorial, TutorialId::NpmBasics);
                assert!(record.completed);
                assert_eq!(record.visits, 2);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(seen[2], ProgressEvent::Reset);
    }
}
