//! File-backed store: one pretty-printed JSON file per document plus
//! `queue.json` for the live queue, all inside one data directory.
//!
//! I/O is synchronous, mirroring browser local storage. Several processes
//! may share the directory; they see each other's writes on their next
//! read (the monitor polls for this).

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

use super::{KaraokeStore, StoreEvent, CHANGE_FEED_CAPACITY};
use crate::errors::KaraokeError;
use crate::models::{sort_by_order_key, QueueItem};

const QUEUE_FILENAME: &str = "queue.json";

pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the queue file.
    write_lock: Mutex<()>,
    changes: broadcast::Sender<StoreEvent>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, KaraokeError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        log::info!("[Store] Using JSON store at {:?}", dir);

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            changes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    fn load_queue(&self) -> Result<Vec<QueueItem>, KaraokeError> {
        let path = self.dir.join(QUEUE_FILENAME);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut items: Vec<QueueItem> = serde_json::from_str(&content)
            .map_err(|e| KaraokeError::Storage(format!("Corrupt queue file: {}", e)))?;
        sort_by_order_key(&mut items);
        Ok(items)
    }

    fn save_queue(&self, items: &[QueueItem]) -> Result<(), KaraokeError> {
        write_atomic(&self.dir.join(QUEUE_FILENAME), &serde_json::to_string_pretty(items)?)
    }

    fn modify_queue<F>(&self, f: F) -> Result<(), KaraokeError>
    where
        F: FnOnce(&mut Vec<QueueItem>),
    {
        {
            let _guard = self.write_lock.lock();
            let mut items = self.load_queue()?;
            f(&mut items);
            sort_by_order_key(&mut items);
            self.save_queue(&items)?;
        }
        let _ = self.changes.send(StoreEvent::QueueChanged);
        Ok(())
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), KaraokeError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl KaraokeStore for JsonFileStore {
    async fn get_all(&self) -> Result<Vec<QueueItem>, KaraokeError> {
        self.load_queue()
    }

    async fn add(&self, item: &QueueItem) -> Result<(), KaraokeError> {
        self.modify_queue(|items| {
            items.retain(|i| i.id != item.id);
            // Another window may have queued the same video first; keep theirs.
            if !items.iter().any(|i| i.video_id() == item.video_id()) {
                items.push(item.clone());
            }
        })
    }

    async fn update_order(&self, id: &str, order_key: f64) -> Result<(), KaraokeError> {
        self.modify_queue(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                item.order_key = order_key;
            }
        })
    }

    async fn delete(&self, id: &str) -> Result<(), KaraokeError> {
        self.modify_queue(|items| items.retain(|i| i.id != id))
    }

    async fn clear(&self) -> Result<(), KaraokeError> {
        self.modify_queue(|items| items.clear())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, KaraokeError> {
        let path = self.document_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Treated as absent; the next write replaces it.
                log::warn!("[Store] Ignoring corrupt document '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KaraokeError> {
        {
            let _guard = self.write_lock.lock();
            write_atomic(&self.document_path(key), &serde_json::to_string_pretty(&value)?)?;
        }
        let _ = self.changes.send(StoreEvent::DocumentChanged(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}
