use parking_lot::RwLock;
use std::sync::Arc;

use crate::errors::KaraokeError;
use crate::favorites::models::FavoriteEntry;
use crate::history::models::HistoryEntry;
use crate::history::HistoryManager;
use crate::models::{sort_by_order_key, Mode, QueueItem, Track};
use crate::notice::Notifier;
use crate::persistence::KaraokeStore;

/// Gap between consecutive order keys on append and after renormalizing.
const ORDER_STEP: f64 = 1.0;

/// Offset above the head used by play-next when nothing follows the head.
const PLAY_NEXT_STEP: f64 = 0.5;

/// Adjacent keys closer than this trigger a renormalization.
const MIN_ORDER_GAP: f64 = 1e-6;

/// Keys drifting past this magnitude trigger a renormalization.
const MAX_ORDER_MAGNITUDE: f64 = 1e12;

enum Write {
    Add(QueueItem),
    Reorder(String, f64),
    Delete(String),
}

/// The play queue. Items are kept sorted by `order_key`; the first item is
/// the one playing. Mutations update the in-memory queue first and are
/// then written through to the store, whose change feed fans out to the
/// other surfaces.
pub struct QueueEngine {
    items: RwLock<Vec<QueueItem>>,
    store: Arc<dyn KaraokeStore>,
    history: Arc<HistoryManager>,
    notifier: Notifier,
}

impl QueueEngine {
    pub fn new(
        store: Arc<dyn KaraokeStore>,
        history: Arc<HistoryManager>,
        notifier: Notifier,
    ) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            store,
            history,
            notifier,
        }
    }

    /// Replaces the in-memory queue with the store's copy. Used at startup
    /// and when another window has written to the shared store.
    pub async fn reconcile(&self) {
        let mut items = match self.store.get_all().await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("[Queue] Could not read queue from store: {}", e);
                return;
            }
        };
        sort_by_order_key(&mut items);

        // Another writer may have raced a duplicate in; keep the earliest.
        let mut seen = std::collections::HashSet::new();
        items.retain(|i| seen.insert(i.video_id().to_string()));

        log::debug!("[Queue] Reconciled {} items from store", items.len());
        *self.items.write() = items;
    }

    pub fn now_playing(&self) -> Option<QueueItem> {
        self.items.read().first().cloned()
    }

    /// Everything after the current item, in play order.
    pub fn up_next(&self) -> Vec<QueueItem> {
        self.items.read().iter().skip(1).cloned().collect()
    }

    pub fn items(&self) -> Vec<QueueItem> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.items.read().iter().any(|i| i.video_id() == video_id)
    }

    pub fn history(&self) -> &Arc<HistoryManager> {
        &self.history
    }

    /// Appends `track` at the tail. Fails with `DuplicateEnqueue` (and a
    /// warning notice) if the video is already queued.
    pub async fn enqueue(&self, track: Track, mode: Mode) -> Result<QueueItem, KaraokeError> {
        let item = {
            let mut items = self.items.write();
            if items.iter().any(|i| i.video_id() == track.video_id) {
                drop(items);
                log::info!("[Queue] '{}' is already queued", track.title);
                self.notifier.warning(
                    "Already in queue",
                    format!("{} is already in the queue.", track.title),
                );
                return Err(KaraokeError::DuplicateEnqueue(track.video_id));
            }
            let key = items
                .last()
                .map(|last| last.order_key + ORDER_STEP)
                .unwrap_or(ORDER_STEP);
            let item = QueueItem::new(track, mode, key);
            items.push(item.clone());
            item
        };

        log::info!(
            "[Queue] Enqueued '{}' ({}) at {}",
            item.track.title,
            mode,
            item.order_key
        );
        self.notifier.info(
            "Song added",
            format!("{} has been added to the queue.", item.track.title),
        );
        self.apply(vec![Write::Add(item.clone())]).await;
        Ok(item)
    }

    /// Moves the item to the head so it plays immediately. The item that
    /// was playing stays queued right behind it and is not recorded to
    /// history.
    pub async fn play_now(&self, video_id: &str) -> Result<(), KaraokeError> {
        let writes = {
            let mut items = self.items.write();
            let pos = position_of(&items, video_id)?;
            if pos == 0 {
                return Ok(());
            }
            let key = items[0].order_key - ORDER_STEP;
            items[pos].order_key = key;
            sort_by_order_key(&mut items);
            let mut writes = vec![Write::Reorder(items[0].id.clone(), key)];
            writes.extend(renormalize_if_needed(&mut items));
            writes
        };

        log::info!("[Queue] Playing {} now", video_id);
        self.apply(writes).await;
        Ok(())
    }

    /// Moves the item to play right after the current one.
    pub async fn play_next(&self, video_id: &str) -> Result<(), KaraokeError> {
        let writes = {
            let mut items = self.items.write();
            let pos = position_of(&items, video_id)?;
            if pos <= 1 {
                return Ok(());
            }
            let head = items[0].order_key;
            let key = match items.iter().skip(1).find(|i| i.video_id() != video_id) {
                Some(second) => (head + second.order_key) / 2.0,
                None => head + PLAY_NEXT_STEP,
            };
            let id = items[pos].id.clone();
            items[pos].order_key = key;
            sort_by_order_key(&mut items);
            let mut writes = vec![Write::Reorder(id, key)];
            writes.extend(renormalize_if_needed(&mut items));
            writes
        };

        log::info!("[Queue] {} plays next", video_id);
        self.apply(writes).await;
        Ok(())
    }

    /// Retires the current item to history and promotes the next one.
    /// Returns the retired item, or `None` on an empty queue.
    pub async fn advance(&self) -> Option<QueueItem> {
        let finished = {
            let mut items = self.items.write();
            if items.is_empty() {
                return None;
            }
            items.remove(0)
        };

        log::info!("[Queue] Finished '{}'", finished.track.title);
        self.history.record(&finished.track, finished.mode).await;
        self.apply(vec![Write::Delete(finished.id.clone())]).await;
        Some(finished)
    }

    /// Removes a queued video. Removing the current item advances instead,
    /// so playback transitions too. Returns the removed item.
    pub async fn remove(&self, video_id: &str) -> Option<QueueItem> {
        let removed = {
            let mut items = self.items.write();
            match items.iter().position(|i| i.video_id() == video_id) {
                None => return None,
                Some(0) => None,
                Some(pos) => Some(items.remove(pos)),
            }
        };

        match removed {
            None => self.advance().await,
            Some(item) => {
                log::info!("[Queue] Removed '{}'", item.track.title);
                self.apply(vec![Write::Delete(item.id.clone())]).await;
                Some(item)
            }
        }
    }

    /// Retires the current item and clears everything else.
    pub async fn stop(&self) -> Option<QueueItem> {
        let finished = self.advance().await;
        let had_items = {
            let mut items = self.items.write();
            let had_items = !items.is_empty();
            items.clear();
            had_items
        };

        if finished.is_some() || had_items {
            log::info!("[Queue] Stopped and cleared");
            if let Err(e) = self.store.clear().await {
                log::warn!("[Queue] Could not clear stored queue: {}", e);
            }
        }
        finished
    }

    /// Takes the most recent history entry and puts it back at the head.
    /// The current item is kept and plays after it. Returns the new head,
    /// or `None` when history is empty. When the latest entry is already
    /// playing nothing changes and the entry stays in history.
    pub async fn previous(&self) -> Option<QueueItem> {
        let latest = self.history.latest()?;
        if let Some(head) = self.now_playing() {
            if head.video_id() == latest.video_id() {
                log::debug!("[Queue] '{}' is already playing", head.track.title);
                return Some(head);
            }
        }
        let entry = self.history.pop_latest().await?;

        let (head, writes) = {
            let mut items = self.items.write();
            let key = items
                .first()
                .map(|head| head.order_key - ORDER_STEP)
                .unwrap_or(ORDER_STEP);

            let mut writes = Vec::new();
            match items.iter().position(|i| i.video_id() == entry.video_id()) {
                Some(0) => {}
                Some(pos) => {
                    items[pos].order_key = key;
                    writes.push(Write::Reorder(items[pos].id.clone(), key));
                }
                None => {
                    let item = QueueItem::new(entry.track.clone(), entry.mode, key);
                    items.push(item.clone());
                    writes.push(Write::Add(item));
                }
            }
            sort_by_order_key(&mut items);
            writes.extend(renormalize_if_needed(&mut items));
            (items.first().cloned(), writes)
        };

        log::info!("[Queue] Back to '{}'", entry.track.title);
        self.apply(writes).await;
        head
    }

    /// Queues a history entry if needed, plays it now and refreshes its
    /// history timestamp.
    pub async fn play_from_history(&self, entry: &HistoryEntry) -> Result<(), KaraokeError> {
        self.queue_and_play(&entry.track, entry.mode).await?;
        self.history.record(&entry.track, entry.mode).await;
        Ok(())
    }

    /// Queues a favorite if needed and plays it now.
    pub async fn play_from_favorites(&self, entry: &FavoriteEntry) -> Result<(), KaraokeError> {
        self.queue_and_play(&entry.track, entry.mode).await
    }

    async fn queue_and_play(&self, track: &Track, mode: Mode) -> Result<(), KaraokeError> {
        if !self.contains(&track.video_id) {
            match self.enqueue(track.clone(), mode).await {
                Ok(_) | Err(KaraokeError::DuplicateEnqueue(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.play_now(&track.video_id).await
    }

    /// Rewrites order keys to evenly spaced integers, keeping the order.
    pub async fn renormalize(&self) {
        let writes = {
            let mut items = self.items.write();
            renormalize(&mut items)
        };
        if !writes.is_empty() {
            log::info!("[Queue] Renormalized {} order keys", writes.len());
        }
        self.apply(writes).await;
    }

    async fn apply(&self, writes: Vec<Write>) {
        for write in writes {
            let result = match &write {
                Write::Add(item) => self.store.add(item).await,
                Write::Reorder(id, key) => self.store.update_order(id, *key).await,
                Write::Delete(id) => self.store.delete(id).await,
            };
            if let Err(e) = result {
                log::warn!("[Queue] Store write failed: {}", e);
            }
        }
    }
}

fn position_of(items: &[QueueItem], video_id: &str) -> Result<usize, KaraokeError> {
    items
        .iter()
        .position(|i| i.video_id() == video_id)
        .ok_or_else(|| KaraokeError::NotInQueue(video_id.to_string()))
}

fn renormalize(items: &mut [QueueItem]) -> Vec<Write> {
    let mut writes = Vec::new();
    for (idx, item) in items.iter_mut().enumerate() {
        let key = (idx as f64 + 1.0) * ORDER_STEP;
        if item.order_key != key {
            item.order_key = key;
            writes.push(Write::Reorder(item.id.clone(), key));
        }
    }
    writes
}

fn renormalize_if_needed(items: &mut [QueueItem]) -> Vec<Write> {
    let crowded = items
        .windows(2)
        .any(|pair| pair[1].order_key - pair[0].order_key < MIN_ORDER_GAP);
    let drifted = items
        .iter()
        .any(|i| i.order_key.abs() > MAX_ORDER_MAGNITUDE);
    if crowded || drifted {
        log::debug!("[Queue] Order keys exhausted, renormalizing");
        renormalize(items)
    } else {
        Vec::new()
    }
}
