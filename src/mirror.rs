//! Read-only mirror of the shared queue for the second-screen monitor.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;

use crate::errors::KaraokeError;
use crate::models::QueueItem;
use crate::persistence::{KaraokeStore, StoreEvent};

pub struct QueueMirror {
    store: Arc<dyn KaraokeStore>,
    items: RwLock<Vec<QueueItem>>,
    now_playing: watch::Sender<Option<QueueItem>>,
}

impl QueueMirror {
    pub fn new(store: Arc<dyn KaraokeStore>) -> Self {
        let (now_playing, _) = watch::channel(None);
        Self {
            store,
            items: RwLock::new(Vec::new()),
            now_playing,
        }
    }

    /// Reloads the snapshot from the store. The now-playing watch only
    /// fires when the head actually changes.
    pub async fn refresh(&self) -> Result<(), KaraokeError> {
        let items = self.store.get_all().await?;
        let head = items.first().cloned();
        *self.items.write() = items;

        self.now_playing.send_if_modified(|current| {
            let changed = current.as_ref().map(|i| &i.id) != head.as_ref().map(|i| &i.id);
            if changed {
                *current = head;
            }
            changed
        });
        Ok(())
    }

    pub fn now_playing(&self) -> Option<QueueItem> {
        self.now_playing.borrow().clone()
    }

    pub fn items(&self) -> Vec<QueueItem> {
        self.items.read().clone()
    }

    pub fn up_next(&self) -> Vec<QueueItem> {
        self.items.read().iter().skip(1).cloned().collect()
    }

    pub fn watch_now_playing(&self) -> watch::Receiver<Option<QueueItem>> {
        self.now_playing.subscribe()
    }

    /// Follows the store until its change feed closes. The poll interval
    /// picks up writes made by other processes sharing the same storage.
    pub async fn run(self: Arc<Self>, poll: Duration) {
        let changes = self.store.subscribe();
        self.follow(changes, poll).await
    }

    /// Subscribes before spawning so no change between the call and the
    /// task's first poll is missed.
    pub fn spawn(self: Arc<Self>, poll: Duration) -> tokio::task::JoinHandle<()> {
        let changes = self.store.subscribe();
        tokio::spawn(self.follow(changes, poll))
    }

    async fn follow(self: Arc<Self>, mut changes: broadcast::Receiver<StoreEvent>, poll: Duration) {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!("[Mirror] Following queue (poll every {:?})", poll);

        loop {
            tokio::select! {
                event = changes.recv() => match event {
                    Ok(StoreEvent::QueueChanged) => {}
                    Ok(StoreEvent::DocumentChanged(_)) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("[Mirror] Change feed lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.refresh().await {
                log::warn!("[Mirror] Refresh failed: {}", e);
            }
        }

        log::info!("[Mirror] Change feed closed, stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mode, Track};
    use crate::persistence::MemoryStore;

    fn item(id: &str, key: f64) -> QueueItem {
        QueueItem::new(
            Track::new(id, format!("Song {}", id), "Channel", Mode::Karaoke),
            Mode::Karaoke,
            key,
        )
    }

    #[tokio::test]
    async fn test_refresh_snapshots_store() {
        let store = Arc::new(MemoryStore::new());
        store.add(&item("b", 2.0)).await.unwrap();
        store.add(&item("a", 1.0)).await.unwrap();

        let mirror = QueueMirror::new(store);
        assert!(mirror.now_playing().is_none());
        mirror.refresh().await.unwrap();

        assert_eq!(mirror.now_playing().unwrap().video_id(), "a");
        let next: Vec<String> = mirror
            .up_next()
            .iter()
            .map(|i| i.video_id().to_string())
            .collect();
        assert_eq!(next, vec!["b"]);
        assert_eq!(mirror.items().len(), 2);
    }

    #[tokio::test]
    async fn test_watch_fires_only_on_head_change() {
        let store = Arc::new(MemoryStore::new());
        let mirror = QueueMirror::new(store.clone());
        let mut rx = mirror.watch_now_playing();

        store.add(&item("a", 1.0)).await.unwrap();
        mirror.refresh().await.unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        store.add(&item("b", 2.0)).await.unwrap();
        mirror.refresh().await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_run_follows_change_feed() {
        let store = Arc::new(MemoryStore::new());
        let mirror = Arc::new(QueueMirror::new(store.clone()));
        let mut rx = mirror.watch_now_playing();
        let handle = mirror.clone().spawn(Duration::from_secs(3600));

        store.add(&item("a", 1.0)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mirror.now_playing().unwrap().video_id(), "a");
        handle.abort();
    }
}
