//! SQLite-backed store: the queue lives in `queue_items` ordered by a REAL
//! `order_key` column, history and favorites in the `documents` table.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::fs;
use std::path::Path;
use tokio::sync::broadcast;

use crate::errors::KaraokeError;
use crate::models::QueueItem;
use crate::persistence::{KaraokeStore, StoreEvent, CHANGE_FEED_CAPACITY};

pub struct SqliteStore {
    pub pool: Pool<Sqlite>,
    changes: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub async fn open(db_path: &Path) -> Result<Self, KaraokeError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        log::info!("[Store] Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| KaraokeError::Storage(format!("Failed to connect to database: {}", e)))?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self, KaraokeError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, KaraokeError> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&pool).await.map_err(|e| {
                    KaraokeError::Storage(format!(
                        "Failed to execute schema statement '{}': {}",
                        stmt, e
                    ))
                })?;
            }
        }

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self { pool, changes })
    }

    fn notify(&self, event: StoreEvent) {
        let _ = self.changes.send(event);
    }
}

#[async_trait]
impl KaraokeStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<QueueItem>, KaraokeError> {
        let rows: Vec<(String, f64)> =
            sqlx::query_as("SELECT payload, order_key FROM queue_items ORDER BY order_key ASC")
                .fetch_all(&self.pool)
                .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (payload, order_key) in rows {
            match serde_json::from_str::<QueueItem>(&payload) {
                Ok(mut item) => {
                    item.order_key = order_key;
                    items.push(item);
                }
                Err(e) => log::warn!("[Store] Skipping unreadable queue row: {}", e),
            }
        }
        Ok(items)
    }

    async fn add(&self, item: &QueueItem) -> Result<(), KaraokeError> {
        let payload = serde_json::to_string(item)?;

        // Another window may have queued the same video first; keep theirs.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO queue_items (id, video_id, order_key, payload, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(item.video_id())
        .bind(item.order_key)
        .bind(&payload)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            log::debug!("[Store] Queue row for {} already present", item.video_id());
        }
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn update_order(&self, id: &str, order_key: f64) -> Result<(), KaraokeError> {
        sqlx::query("UPDATE queue_items SET order_key = ?, updated_at = ? WHERE id = ?")
            .bind(order_key)
            .bind(Utc::now().timestamp_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), KaraokeError> {
        sqlx::query("DELETE FROM queue_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn clear(&self) -> Result<(), KaraokeError> {
        sqlx::query("DELETE FROM queue_items")
            .execute(&self.pool)
            .await?;
        self.notify(StoreEvent::QueueChanged);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, KaraokeError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((text,)) => match serde_json::from_str(&text) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    log::warn!("[Store] Ignoring corrupt document '{}': {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KaraokeError> {
        let text = serde_json::to_string(&value)?;

        sqlx::query(
            r#"
            INSERT INTO documents (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&text)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.notify(StoreEvent::DocumentChanged(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}
