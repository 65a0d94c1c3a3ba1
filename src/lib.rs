pub mod config;
pub mod database;
pub mod errors;
pub mod favorites;
pub mod history;
pub mod mirror;
pub mod models;
pub mod notice;
pub mod persistence;
pub mod playback;
pub mod presentation;
pub mod queue;
pub mod search;

use std::sync::Arc;

use config::{KaraokeConfig, StorageBackend};
use database::SqliteStore;
use errors::KaraokeError;
use favorites::FavoritesManager;
use history::HistoryManager;
use mirror::QueueMirror;
use models::Track;
use notice::Notifier;
use persistence::{JsonFileStore, KaraokeStore, MemoryStore, ResilientStore};
use playback::{CastContext, LocalPlayer, PlaybackController};
use queue::QueueEngine;
use search::{SearchFilter, YouTubeSearchClient};

pub const DATABASE_FILE: &str = "karaoke.db";

/// Everything a rendering surface needs, wired to one shared store.
pub struct KaraokeApp {
    pub config: KaraokeConfig,
    pub store: Arc<ResilientStore>,
    pub notifier: Notifier,
    pub history: Arc<HistoryManager>,
    pub favorites: Arc<FavoritesManager>,
    pub queue: Arc<QueueEngine>,
    search: YouTubeSearchClient,
}

impl KaraokeApp {
    /// Opens the configured storage, loads the ledgers and reconciles the
    /// queue. Storage that cannot be opened degrades to memory for the
    /// session instead of failing startup.
    pub async fn open(config: KaraokeConfig) -> Result<Self, KaraokeError> {
        let notifier = Notifier::new();
        let store = Arc::new(Self::open_store(&config, &notifier).await);
        let shared: Arc<dyn KaraokeStore> = store.clone();

        let history = Arc::new(HistoryManager::new(
            shared.clone(),
            notifier.clone(),
            config.history_limit,
        ));
        let favorites = Arc::new(FavoritesManager::new(shared.clone(), notifier.clone()));
        history.load().await;
        favorites.load().await;

        let queue = Arc::new(QueueEngine::new(shared, history.clone(), notifier.clone()));
        queue.reconcile().await;

        let search =
            YouTubeSearchClient::new(config.youtube_api_key.clone(), config.search_max_results)?;

        log::info!(
            "[App] Ready: {} queued, {} in history, {} favorites",
            queue.len(),
            history.len(),
            favorites.len()
        );

        Ok(Self {
            config,
            store,
            notifier,
            history,
            favorites,
            queue,
            search,
        })
    }

    async fn open_store(config: &KaraokeConfig, notifier: &Notifier) -> ResilientStore {
        let primary: Result<Arc<dyn KaraokeStore>, KaraokeError> = match config.storage {
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageBackend::Json => JsonFileStore::new(&config.data_dir)
                .map(|s| Arc::new(s) as Arc<dyn KaraokeStore>),
            StorageBackend::Sqlite => SqliteStore::open(&config.data_dir.join(DATABASE_FILE))
                .await
                .map(|s| Arc::new(s) as Arc<dyn KaraokeStore>),
        };

        match primary {
            Ok(primary) => {
                log::info!("[Store] Using {:?} storage", config.storage);
                ResilientStore::new(primary)
            }
            Err(e) => {
                log::warn!("[Store] Could not open {:?} storage: {}", config.storage, e);
                notifier.warning(
                    "Storage unavailable",
                    "Changes will not be saved after this session.",
                );
                ResilientStore::in_memory()
            }
        }
    }

    /// A controller driving `local` and, when present, a cast SDK. Spawn
    /// [`PlaybackController::run`] with [`KaraokeApp::store`]'s feed and
    /// `config.monitor_poll()` to keep it in step with the shared queue.
    pub fn controller(
        &self,
        local: Arc<dyn LocalPlayer>,
        cast: Option<Arc<dyn CastContext>>,
    ) -> Arc<PlaybackController> {
        Arc::new(PlaybackController::new(
            self.queue.clone(),
            local,
            cast,
            self.notifier.clone(),
        ))
    }

    pub fn mirror(&self) -> Arc<QueueMirror> {
        Arc::new(QueueMirror::new(self.store.clone()))
    }

    pub async fn search(&self, query: &str, filter: SearchFilter) -> Result<Vec<Track>, KaraokeError> {
        self.search.search(query, filter).await
    }
}
