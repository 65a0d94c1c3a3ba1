pub mod models;

use chrono::Utc;
use models::FavoriteEntry;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::{Mode, Track};
use crate::notice::Notifier;
use crate::persistence::{KaraokeStore, FAVORITES_KEY};

/// Favorite songs keyed by video id, newest first.
pub struct FavoritesManager {
    entries: RwLock<Vec<FavoriteEntry>>,
    store: Arc<dyn KaraokeStore>,
    notifier: Notifier,
}

impl FavoritesManager {
    pub fn new(store: Arc<dyn KaraokeStore>, notifier: Notifier) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            store,
            notifier,
        }
    }

    pub async fn load(&self) {
        let entries = match self.store.read(FAVORITES_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<FavoriteEntry>>(value) {
                Ok(mut entries) => {
                    let mut seen = std::collections::HashSet::new();
                    entries.retain(|e| seen.insert(e.video_id().to_string()));
                    entries
                }
                Err(e) => {
                    log::warn!("[Favorites] Could not parse saved favorites: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("[Favorites] Could not load saved favorites: {}", e);
                Vec::new()
            }
        };

        log::info!("[Favorites] Loaded {} entries", entries.len());
        *self.entries.write() = entries;
    }

    /// Adds the track if absent, removes it if present. Returns whether the
    /// track is a favorite afterwards.
    pub async fn toggle(&self, track: &Track, mode: Mode) -> bool {
        let (now_favorite, snapshot) = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|e| e.video_id() != track.video_id);
            let removed = entries.len() != before;
            if !removed {
                entries.insert(
                    0,
                    FavoriteEntry {
                        track: track.clone(),
                        favorited_at: Utc::now(),
                        mode,
                    },
                );
            }
            (!removed, entries.clone())
        };

        if now_favorite {
            log::info!("[Favorites] Added '{}'", track.title);
            self.notifier.info(
                "Added to favorites",
                format!("{} has been added to your favorites.", track.title),
            );
        } else {
            log::info!("[Favorites] Removed '{}'", track.title);
            self.notifier.info(
                "Removed from favorites",
                format!("{} has been removed from your favorites.", track.title),
            );
        }

        self.persist(snapshot).await;
        now_favorite
    }

    pub fn is_favorite(&self, video_id: &str) -> bool {
        self.entries.read().iter().any(|e| e.video_id() == video_id)
    }

    pub fn entries(&self) -> Vec<FavoriteEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    async fn persist(&self, entries: Vec<FavoriteEntry>) {
        let value = match serde_json::to_value(&entries) {
            Ok(v) => v,
            Err(e) => {
                log::error!("[Favorites] Failed to serialize favorites: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.write(FAVORITES_KEY, value).await {
            log::warn!("[Favorites] Could not save favorites: {}", e);
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

    #[tokio::test]
    async fn test_toggle_is_its_own_inverse() {
        let favorites = FavoritesManager::new(Arc::new(MemoryStore::new()), Notifier::new());
        assert!(!favorites.is_favorite("a"));

        assert!(favorites.toggle(&track("a"), Mode::Karaoke).await);
        assert!(favorites.is_favorite("a"));

        assert!(!favorites.toggle(&track("a"), Mode::Karaoke).await);
        assert!(!favorites.is_favorite("a"));
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_and_persisted() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let favorites = FavoritesManager::new(store.clone(), Notifier::new());
        favorites.toggle(&track("a"), Mode::Karaoke).await;
        favorites.toggle(&track("b"), Mode::Original).await;

        let reloaded = FavoritesManager::new(store, Notifier::new());
        reloaded.load().await;
        let ids: Vec<String> = reloaded
            .entries()
            .iter()
            .map(|e| e.video_id().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(reloaded.entries()[0].mode, Mode::Original);
    }

    #[tokio::test]
    async fn test_toggle_emits_notice() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let favorites = FavoritesManager::new(Arc::new(MemoryStore::new()), notifier);
        favorites.toggle(&track("a"), Mode::Karaoke).await;
        favorites.toggle(&track("a"), Mode::Karaoke).await;
        assert_eq!(rx.try_recv().unwrap().title, "Added to favorites");
        assert_eq!(rx.try_recv().unwrap().title, "Removed from favorites");
    }
}
