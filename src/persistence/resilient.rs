//! Degrade-to-memory wrapper.
//!
//! Every write goes to the primary store and to an in-memory shadow. The
//! first primary failure flips the wrapper into degraded mode for the rest
//! of the session: a warning is logged and all reads and writes are served
//! by the shadow, so callers never see a storage error.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{KaraokeStore, MemoryStore, StoreEvent, CHANGE_FEED_CAPACITY};
use crate::errors::KaraokeError;
use crate::models::QueueItem;

pub struct ResilientStore {
    primary: Arc<dyn KaraokeStore>,
    shadow: MemoryStore,
    degraded: AtomicBool,
    changes: broadcast::Sender<StoreEvent>,
}

impl ResilientStore {
    pub fn new(primary: Arc<dyn KaraokeStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            primary,
            shadow: MemoryStore::new(),
            degraded: AtomicBool::new(false),
            changes,
        }
    }

    /// Starts already degraded, for when the primary could not even be opened.
    pub fn in_memory() -> Self {
        let store = Self::new(Arc::new(MemoryStore::new()));
        store.degraded.store(true, Ordering::SeqCst);
        store
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn degrade(&self, operation: &str, err: &KaraokeError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            log::warn!(
                "[Store] {} failed ({}); continuing with in-memory storage for this session",
                operation,
                err
            );
        } else {
            log::debug!("[Store] {} failed while degraded: {}", operation, err);
        }
    }

    fn notify(&self, event: StoreEvent) {
        let _ = self.changes.send(event);
    }

    async fn mirror_write<F>(&self, operation: &str, primary_op: F)
    where
        F: std::future::Future<Output = Result<(), KaraokeError>> + Send,
    {
        if self.is_degraded() {
            return;
        }
        if let Err(e) = primary_op.await {
            self.degrade(operation, &e);
        }
    }
}

#[async_trait]
impl KaraokeStore for ResilientStore {
    async fn get_all(&self) -> Result<Vec<QueueItem>, KaraokeError> {
        if !self.is_degraded() {
            match self.primary.get_all().await {
                Ok(items) => {
                    self.shadow.replace_queue(items.clone());
                    return Ok(items);
                }
                Err(e) => self.degrade("Queue read", &e),
            }
        }
        self.shadow.get_all().await
    }

    async fn add(&self, item: &QueueItem) -> Result<(), KaraokeError> {
        self.shadow.add(item).await?;
        self.mirror_write("Queue add", self.primary.add(item)).await;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn update_order(&self, id: &str, order_key: f64) -> Result<(), KaraokeError> {
        self.shadow.update_order(id, order_key).await?;
        self.mirror_write("Queue reorder", self.primary.update_order(id, order_key))
            .await;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), KaraokeError> {
        self.shadow.delete(id).await?;
        self.mirror_write("Queue delete", self.primary.delete(id)).await;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn clear(&self) -> Result<(), KaraokeError> {
        self.shadow.clear().await?;
        self.mirror_write("Queue clear", self.primary.clear()).await;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, KaraokeError> {
        if !self.is_degraded() {
            match self.primary.read(key).await {
                Ok(value) => {
                    match &value {
                        Some(v) => self.shadow.put_document(key, v.clone()),
                        None => self.shadow.remove_document(key),
                    }
                    return Ok(value);
                }
                Err(e) => self.degrade("Document read", &e),
            }
        }
        self.shadow.read(key).await
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KaraokeError> {
        self.shadow.put_document(key, value.clone());
        self.mirror_write("Document write", self.primary.write(key, value))
            .await;
        self.notify(StoreEvent::DocumentChanged(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}
