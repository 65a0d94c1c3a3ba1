//! Storage capability shared by every rendering surface.
//!
//! A store holds two kinds of data:
//! - the live queue, an ordered collection of [`QueueItem`]s keyed by id
//!   and sorted by `order_key`
//! - whole JSON documents (history, favorites) read and written as a unit
//!
//! Every successful write is announced on a broadcast change feed so other
//! surfaces (monitor window, playback controller) can reconcile. There is
//! no locking between writers; the last write wins.

pub mod json_file;
pub mod memory;
pub mod resilient;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::KaraokeError;
use crate::models::QueueItem;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use resilient::ResilientStore;

pub const HISTORY_KEY: &str = "karaoke-history";
pub const FAVORITES_KEY: &str = "karaoke-favorites";

pub(crate) const CHANGE_FEED_CAPACITY: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    QueueChanged,
    DocumentChanged(String),
}

#[async_trait]
pub trait KaraokeStore: Send + Sync {
    /// All queue items, lowest order key first.
    async fn get_all(&self) -> Result<Vec<QueueItem>, KaraokeError>;

    async fn add(&self, item: &QueueItem) -> Result<(), KaraokeError>;

    async fn update_order(&self, id: &str, order_key: f64) -> Result<(), KaraokeError>;

    async fn delete(&self, id: &str) -> Result<(), KaraokeError>;

    async fn clear(&self) -> Result<(), KaraokeError>;

    async fn read(&self, key: &str) -> Result<Option<Value>, KaraokeError>;

    async fn write(&self, key: &str, value: Value) -> Result<(), KaraokeError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
