use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;

use super::{KaraokeStore, StoreEvent, CHANGE_FEED_CAPACITY};
use crate::errors::KaraokeError;
use crate::models::{sort_by_order_key, QueueItem};

/// In-process store. Also used as the degraded fallback when real storage
/// is unavailable.
pub struct MemoryStore {
    queue: RwLock<Vec<QueueItem>>,
    documents: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            queue: RwLock::new(Vec::new()),
            documents: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Replaces the whole queue without emitting a change event.
    pub(crate) fn replace_queue(&self, mut items: Vec<QueueItem>) {
        sort_by_order_key(&mut items);
        *self.queue.write() = items;
    }

    pub(crate) fn put_document(&self, key: &str, value: Value) {
        self.documents.write().insert(key.to_string(), value);
    }

    pub(crate) fn remove_document(&self, key: &str) {
        self.documents.write().remove(key);
    }

    fn notify(&self, event: StoreEvent) {
        let _ = self.changes.send(event);
    }
}

#[async_trait]
impl KaraokeStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<QueueItem>, KaraokeError> {
        Ok(self.queue.read().clone())
    }

    async fn add(&self, item: &QueueItem) -> Result<(), KaraokeError> {
        {
            let mut queue = self.queue.write();
            queue.retain(|i| i.id != item.id);
            if queue.iter().any(|i| i.video_id() == item.video_id()) {
                log::debug!("[Store] Queue entry for {} already present", item.video_id());
            } else {
                queue.push(item.clone());
                sort_by_order_key(&mut queue);
            }
        }
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn update_order(&self, id: &str, order_key: f64) -> Result<(), KaraokeError> {
        {
            let mut queue = self.queue.write();
            if let Some(item) = queue.iter_mut().find(|i| i.id == id) {
                item.order_key = order_key;
            }
            sort_by_order_key(&mut queue);
        }
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), KaraokeError> {
        self.queue.write().retain(|i| i.id != id);
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn clear(&self) -> Result<(), KaraokeError> {
        self.queue.write().clear();
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, KaraokeError> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KaraokeError> {
        self.put_document(key, value);
        self.notify(StoreEvent::DocumentChanged(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}
