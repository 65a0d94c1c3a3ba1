pub mod models;

use chrono::Utc;
use models::HistoryEntry;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::{Mode, Track};
use crate::notice::Notifier;
use crate::persistence::{KaraokeStore, HISTORY_KEY};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Most-recent-first play history, deduplicated by video id and capped at
/// `limit` entries. Persisted as a single document.
pub struct HistoryManager {
    entries: RwLock<Vec<HistoryEntry>>,
    limit: usize,
    store: Arc<dyn KaraokeStore>,
    notifier: Notifier,
}

impl HistoryManager {
    pub fn new(store: Arc<dyn KaraokeStore>, notifier: Notifier, limit: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            limit: limit.max(1),
            store,
            notifier,
        }
    }

    /// Loads the persisted ledger. Unreadable or corrupt data starts an
    /// empty ledger instead of failing.
    pub async fn load(&self) {
        let loaded = match self.store.read(HISTORY_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("[History] Could not parse saved history: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("[History] Could not load saved history: {}", e);
                Vec::new()
            }
        };

        let mut entries = Vec::with_capacity(loaded.len().min(self.limit));
        for entry in loaded {
            if entries.len() >= self.limit {
                break;
            }
            if !entries
                .iter()
                .any(|e: &HistoryEntry| e.video_id() == entry.video_id())
            {
                entries.push(entry);
            }
        }

        log::info!("[History] Loaded {} entries", entries.len());
        *self.entries.write() = entries;
    }

    /// Puts `track` at the front, dropping any earlier entry for the same video.
    pub async fn record(&self, track: &Track, mode: Mode) -> HistoryEntry {
        let entry = HistoryEntry {
            track: track.clone(),
            played_at: Utc::now(),
            mode,
        };

        let snapshot = {
            let mut entries = self.entries.write();
            entries.retain(|e| e.video_id() != track.video_id);
            entries.insert(0, entry.clone());
            entries.truncate(self.limit);
            entries.clone()
        };

        log::debug!("[History] Recorded '{}' ({})", track.title, mode);
        self.persist(snapshot).await;
        entry
    }

    /// Removes and returns the most recent entry.
    pub async fn pop_latest(&self) -> Option<HistoryEntry> {
        let (popped, snapshot) = {
            let mut entries = self.entries.write();
            if entries.is_empty() {
                return None;
            }
            let popped = entries.remove(0);
            (popped, entries.clone())
        };

        self.persist(snapshot).await;
        Some(popped)
    }

    pub async fn clear(&self) {
        self.entries.write().clear();
        self.persist(Vec::new()).await;
        log::info!("[History] Cleared");
        self.notifier
            .info("History cleared", "All song history has been removed.");
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().clone()
    }

    pub fn latest(&self) -> Option<HistoryEntry> {
        self.entries.read().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    async fn persist(&self, entries: Vec<HistoryEntry>) {
        let value = match serde_json::to_value(&entries) {
            Ok(v) => v,
            Err(e) => {
                log::error!("[History] Failed to serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.write(HISTORY_KEY, value).await {
            log::warn!("[History] Could not save history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), "Channel", Mode::Karaoke)
    }

    fn manager(store: Arc<dyn KaraokeStore>) -> HistoryManager {
        HistoryManager::new(store, Notifier::new(), DEFAULT_HISTORY_LIMIT)
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let history = manager(Arc::new(MemoryStore::new()));
        for i in 0..75 {
            history.record(&track(&i.to_string()), Mode::Karaoke).await;
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.latest().unwrap().video_id(), "74");
        assert_eq!(history.entries()[49].video_id(), "25");
    }

    #[tokio::test]
    async fn test_rerecord_moves_to_front() {
        let history = manager(Arc::new(MemoryStore::new()));
        history.record(&track("a"), Mode::Karaoke).await;
        history.record(&track("b"), Mode::Karaoke).await;
        history.record(&track("c"), Mode::Karaoke).await;
        history.record(&track("a"), Mode::Original).await;

        let ids: Vec<String> = history
            .entries()
            .iter()
            .map(|e| e.video_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(history.latest().unwrap().mode, Mode::Original);
    }

    #[tokio::test]
    async fn test_pop_latest() {
        let history = manager(Arc::new(MemoryStore::new()));
        assert!(history.pop_latest().await.is_none());
        history.record(&track("a"), Mode::Karaoke).await;
        history.record(&track("b"), Mode::Karaoke).await;
        assert_eq!(history.pop_latest().await.unwrap().video_id(), "b");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let history = manager(store.clone());
        history.record(&track("a"), Mode::Karaoke).await;
        history.record(&track("b"), Mode::Original).await;

        let reloaded = manager(store);
        reloaded.load().await;
        assert_eq!(reloaded.entries(), history.entries());
    }

    #[tokio::test]
    async fn test_corrupt_document_loads_empty() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        store
            .write(HISTORY_KEY, serde_json::json!({"not": "a list"}))
            .await
            .unwrap();
        let history = manager(store);
        history.load().await;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_and_notifies() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let history = HistoryManager::new(Arc::new(MemoryStore::new()), notifier, 50);
        history.record(&track("a"), Mode::Karaoke).await;
        history.clear().await;
        assert!(history.is_empty());
        assert_eq!(rx.try_recv().unwrap().title, "History cleared");
    }
}
