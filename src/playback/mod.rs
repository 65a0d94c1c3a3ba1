//! Playback surface adapter
//!
//! Owns the decision of *where* the now-playing track is rendered:
//! - the embedded local player, or
//! - a cast receiver, while a cast session is active
//!
//! Whichever surface is active reports a single "ended" or "error" signal
//! and the controller advances the queue. Failures never stall the queue:
//! a track that cannot be played is recorded to history and skipped.

pub mod surface;
pub mod types;

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::errors::KaraokeError;
use crate::models::Track;
use crate::notice::Notifier;
use crate::persistence::StoreEvent;
use crate::queue::QueueEngine;

pub use surface::{CastContext, CastMedia, CastSession, LocalPlayer};
pub use types::{CastSessionEvent, PlaybackSession, PlaybackState, Surface, SurfaceKind};

enum SyncAction {
    Nothing,
    StopLocal,
    StopCast(Arc<dyn CastSession>),
    LoadLocal(Track),
    LoadCast(Arc<dyn CastSession>, Track),
}

pub struct PlaybackController {
    engine: Arc<QueueEngine>,
    local: Arc<dyn LocalPlayer>,
    cast: Option<Arc<dyn CastContext>>,
    session: RwLock<PlaybackSession>,
    /// Set between a cast request and the SDK's answer.
    connecting: RwLock<bool>,
    notifier: Notifier,
}

impl PlaybackController {
    pub fn new(
        engine: Arc<QueueEngine>,
        local: Arc<dyn LocalPlayer>,
        cast: Option<Arc<dyn CastContext>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            engine,
            local,
            cast,
            session: RwLock::new(PlaybackSession::default()),
            connecting: RwLock::new(false),
            notifier,
        }
    }

    pub fn state(&self) -> PlaybackState {
        let session = self.session.read();
        if *self.connecting.read() && session.surface.kind() == SurfaceKind::Local {
            return PlaybackState::CastConnecting;
        }
        session.state.clone()
    }

    pub fn surface_kind(&self) -> SurfaceKind {
        self.session.read().surface.kind()
    }

    pub fn volume(&self) -> u8 {
        self.session.read().volume
    }

    /// Whether the cast affordance should be enabled.
    pub fn cast_available(&self) -> bool {
        self.cast.as_ref().map(|c| c.is_available()).unwrap_or(false)
    }

    /// Makes the active surface render the queue's current item.
    pub async fn sync_now_playing(&self) {
        let now = self.engine.now_playing();

        let action = {
            let mut session = self.session.write();
            match (now, session.surface.clone()) {
                (None, Surface::Local) => {
                    if session.state == PlaybackState::Idle {
                        SyncAction::Nothing
                    } else {
                        session.state = PlaybackState::Idle;
                        SyncAction::StopLocal
                    }
                }
                (None, Surface::Cast(cast)) => {
                    session.last_cast_video_id = None;
                    let was_loaded = session.state.video_id().is_some();
                    session.state = PlaybackState::Idle;
                    if was_loaded {
                        SyncAction::StopCast(cast)
                    } else {
                        SyncAction::Nothing
                    }
                }
                (Some(item), Surface::Local) => {
                    if session.state.video_id() == Some(item.video_id()) {
                        SyncAction::Nothing
                    } else {
                        session.state = PlaybackState::LocalPlaying(item.video_id().to_string());
                        SyncAction::LoadLocal(item.track)
                    }
                }
                (Some(item), Surface::Cast(cast)) => {
                    if session.last_cast_video_id.as_deref() == Some(item.video_id()) {
                        SyncAction::Nothing
                    } else {
                        // Marked before sending so a concurrent sync cannot send twice.
                        session.last_cast_video_id = Some(item.video_id().to_string());
                        SyncAction::LoadCast(cast, item.track)
                    }
                }
            }
        };

        match action {
            SyncAction::Nothing => {}
            SyncAction::StopLocal => {
                log::info!("[Playback] Queue empty, stopping local player");
                self.local.stop();
            }
            SyncAction::StopCast(cast) => {
                log::info!("[Playback] Queue empty, stopping receiver");
                if let Err(e) = cast.stop().await {
                    log::warn!("[Playback] Failed to stop receiver: {}", e);
                }
            }
            SyncAction::LoadLocal(track) => {
                log::info!("[Playback] Local: '{}'", track.title);
                self.local.load(&track);
            }
            SyncAction::LoadCast(cast, track) => self.load_on_receiver(cast, track).await,
        }
    }

    async fn load_on_receiver(&self, cast: Arc<dyn CastSession>, track: Track) {
        log::info!(
            "[Playback] Casting '{}' to session {}",
            track.title,
            cast.id()
        );

        match cast.load_media(CastMedia::from_track(&track)).await {
            Ok(()) => {
                let mut session = self.session.write();
                if session.last_cast_video_id.as_deref() == Some(track.video_id.as_str()) {
                    session.state = PlaybackState::CastPlaying(track.video_id.clone());
                }
            }
            Err(e) => {
                log::error!("[Playback] Error loading '{}' on receiver: {}", track.title, e);
                {
                    let mut session = self.session.write();
                    if session.last_cast_video_id.as_deref() == Some(track.video_id.as_str()) {
                        session.last_cast_video_id = None;
                    }
                    if matches!(session.surface, Surface::Cast(_)) {
                        session.state = PlaybackState::CastConnecting;
                    }
                }
                self.notifier.warning(
                    "Cast error",
                    format!("{} could not be loaded on the TV.", track.title),
                );
            }
        }
    }

    /// Natural end of the track on `source`. Signals from the inactive
    /// surface, or for a track that is no longer playing, are ignored.
    pub async fn on_track_ended(&self, source: SurfaceKind, video_id: &str) {
        if !self.is_current(source, video_id) {
            return;
        }
        log::info!("[Playback] Ended: {}", video_id);
        self.engine.advance().await;
        self.sync_now_playing().await;
    }

    /// The active surface could not play the track (removed, private,
    /// embedding disabled). The track is recorded to history and skipped.
    pub async fn on_track_error(&self, source: SurfaceKind, video_id: &str, reason: &str) {
        if !self.is_current(source, video_id) {
            return;
        }
        log::warn!("[Playback] Cannot play {}: {}", video_id, reason);
        self.notifier.warning(
            "Video error",
            "The video cannot be played, skipping to the next song.",
        );
        self.engine.advance().await;
        self.sync_now_playing().await;
    }

    fn is_current(&self, source: SurfaceKind, video_id: &str) -> bool {
        let active = self.surface_kind();
        if source != active {
            log::debug!(
                "[Playback] Ignoring signal from inactive {:?} surface for {}",
                source,
                video_id
            );
            return false;
        }
        match self.engine.now_playing() {
            Some(item) if item.video_id() == video_id => true,
            _ => {
                log::debug!("[Playback] Ignoring stale signal for {}", video_id);
                false
            }
        }
    }

    /// Opens the receiver picker. `CastUnavailable` when there is no SDK.
    pub async fn request_cast(&self) -> Result<(), KaraokeError> {
        let Some(ctx) = self.cast.clone().filter(|c| c.is_available()) else {
            log::info!("[Playback] Cast requested but not available");
            return Err(KaraokeError::CastUnavailable);
        };

        *self.connecting.write() = true;
        if let Err(e) = ctx.request_session().await {
            *self.connecting.write() = false;
            log::warn!("[Playback] Cast session request failed: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Cast SDK session callback. Safe to call repeatedly with the same event.
    pub async fn on_cast_session(&self, event: CastSessionEvent) {
        log::debug!("[Playback] Cast session event: {:?}", event);
        match event {
            CastSessionEvent::Starting => {
                *self.connecting.write() = true;
            }
            CastSessionEvent::StartFailed => {
                *self.connecting.write() = false;
                self.notifier
                    .warning("Cast failed", "Could not connect to the TV.");
            }
            CastSessionEvent::Started | CastSessionEvent::Resumed => {
                *self.connecting.write() = false;
                self.attach_cast_session().await;
            }
            CastSessionEvent::Ending => {}
            CastSessionEvent::Ended | CastSessionEvent::Lost => {
                *self.connecting.write() = false;
                self.detach_cast_session(event).await;
            }
        }
    }

    async fn attach_cast_session(&self) {
        let Some(ctx) = self.cast.as_ref() else {
            log::warn!("[Playback] Cast session event without a cast context");
            return;
        };
        let Some(cast) = ctx.current_session() else {
            log::warn!("[Playback] Cast session started but none is current");
            return;
        };

        let switched = {
            let mut session = self.session.write();
            match &session.surface {
                Surface::Cast(current) if current.id() == cast.id() => false,
                _ => {
                    log::info!("[Playback] Cast session {} active", cast.id());
                    session.surface = Surface::Cast(cast);
                    session.last_cast_video_id = None;
                    session.state = PlaybackState::CastConnecting;
                    true
                }
            }
        };

        if switched {
            // Avoid double audio while the TV plays.
            self.local.pause();
            self.local.set_muted(true);
        }
        self.sync_now_playing().await;
    }

    async fn detach_cast_session(&self, event: CastSessionEvent) {
        let was_casting = {
            let mut session = self.session.write();
            if matches!(session.surface, Surface::Cast(_)) {
                session.surface = Surface::Local;
                session.last_cast_video_id = None;
                session.state = PlaybackState::Idle;
                true
            } else {
                false
            }
        };

        if was_casting {
            log::info!("[Playback] Cast session {:?}, resuming locally", event);
            self.local.set_muted(false);
            // Restarts the current track from the beginning.
            self.sync_now_playing().await;
        }
    }

    pub async fn play(&self) {
        let state = self.session.read().state.clone();
        match state {
            PlaybackState::LocalPaused(id) => {
                self.local.play();
                self.session.write().state = PlaybackState::LocalPlaying(id);
            }
            PlaybackState::CastPaused(id) => {
                if let Some(cast) = self.active_cast() {
                    if let Err(e) = cast.play().await {
                        log::warn!("[Playback] Receiver play failed: {}", e);
                        return;
                    }
                }
                self.session.write().state = PlaybackState::CastPlaying(id);
            }
            PlaybackState::Idle | PlaybackState::CastConnecting => self.sync_now_playing().await,
            PlaybackState::LocalPlaying(_) | PlaybackState::CastPlaying(_) => {}
        }
    }

    pub async fn pause(&self) {
        let state = self.session.read().state.clone();
        match state {
            PlaybackState::LocalPlaying(id) => {
                self.local.pause();
                self.session.write().state = PlaybackState::LocalPaused(id);
            }
            PlaybackState::CastPlaying(id) => {
                if let Some(cast) = self.active_cast() {
                    if let Err(e) = cast.pause().await {
                        log::warn!("[Playback] Receiver pause failed: {}", e);
                        return;
                    }
                }
                self.session.write().state = PlaybackState::CastPaused(id);
            }
            _ => {}
        }
    }

    pub async fn toggle(&self) {
        if self.session.read().state.is_playing() {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    pub async fn seek(&self, position_secs: f64) {
        let position_secs = position_secs.max(0.0);
        match self.active_cast() {
            Some(cast) => {
                if let Err(e) = cast.seek(position_secs).await {
                    log::warn!("[Playback] Receiver seek failed: {}", e);
                }
            }
            None => self.local.seek(position_secs),
        }
    }

    /// Volume 0-100 on the active surface.
    pub async fn set_volume(&self, volume: u8) {
        let volume = volume.min(100);
        self.session.write().volume = volume;
        match self.active_cast() {
            Some(cast) => {
                if let Err(e) = cast.set_volume(volume as f32 / 100.0).await {
                    log::warn!("[Playback] Receiver volume failed: {}", e);
                }
            }
            None => self.local.set_volume(volume),
        }
    }

    /// Skips the current song (it still goes to history).
    pub async fn skip(&self) {
        self.engine.advance().await;
        self.sync_now_playing().await;
    }

    pub async fn previous(&self) {
        self.engine.previous().await;
        self.sync_now_playing().await;
    }

    pub async fn stop(&self) {
        self.engine.stop().await;
        self.sync_now_playing().await;
    }

    fn active_cast(&self) -> Option<Arc<dyn CastSession>> {
        match &self.session.read().surface {
            Surface::Cast(cast) => Some(cast.clone()),
            Surface::Local => None,
        }
    }

    /// Reloads the queue from the shared store, then renders its head.
    pub async fn reload(&self) {
        self.engine.reconcile().await;
        self.sync_now_playing().await;
    }

    /// Follows the shared queue until the change feed closes. Every change
    /// event reloads from the store so writes made by other windows reach
    /// this player; the poll interval picks up writes made by other
    /// processes sharing the same storage.
    pub async fn run(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<StoreEvent>,
        poll: Duration,
    ) {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!("[Playback] Following queue (poll every {:?})", poll);

        loop {
            tokio::select! {
                event = changes.recv() => match event {
                    Ok(StoreEvent::QueueChanged) => {}
                    Ok(StoreEvent::DocumentChanged(_)) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("[Playback] Change feed lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick() => {}
            }

            self.reload().await;
        }
        log::info!("[Playback] Change feed closed");
    }
}

#[cfg(test)]
mod tests {
    use super::surface::fakes::{FakeCastContext, FakePlayer, FakeSession};
    use super::*;
    use crate::history::HistoryManager;
    use crate::models::Mode;
    use crate::persistence::{JsonFileStore, KaraokeStore, MemoryStore};

    struct Rig {
        engine: Arc<QueueEngine>,
        player: Arc<FakePlayer>,
        cast: Arc<FakeCastContext>,
        controller: PlaybackController,
    }

    fn rig() -> Rig {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let notifier = Notifier::new();
        let history = Arc::new(HistoryManager::new(store.clone(), notifier.clone(), 50));
        let engine = Arc::new(QueueEngine::new(store, history, notifier.clone()));
        let player = Arc::new(FakePlayer::default());
        let cast = FakeCastContext::available();
        let controller = PlaybackController::new(
            engine.clone(),
            player.clone(),
            Some(cast.clone()),
            notifier,
        );
        Rig {
            engine,
            player,
            cast,
            controller,
        }
    }

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), "Channel", Mode::Karaoke)
    }

    async fn queue(rig: &Rig, ids: &[&str]) {
        for id in ids {
            rig.engine.enqueue(track(id), Mode::Karaoke).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_idle_to_local_playing() {
        let rig = rig();
        assert_eq!(rig.controller.state(), PlaybackState::Idle);
        queue(&rig, &["a"]).await;
        rig.controller.sync_now_playing().await;
        rig.controller.sync_now_playing().await;
        assert_eq!(rig.controller.state(), PlaybackState::LocalPlaying("a".into()));
        assert_eq!(rig.player.calls(), vec!["load:a"]);
    }

    #[tokio::test]
    async fn test_cast_sends_current_track_once() {
        let rig = rig();
        queue(&rig, &["x"]).await;
        rig.controller.sync_now_playing().await;

        let session = FakeSession::new("tv-1");
        rig.cast.connect(session.clone());
        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        assert_eq!(session.loaded(), vec!["x"]);
        assert_eq!(rig.controller.state(), PlaybackState::CastPlaying("x".into()));
        assert_eq!(rig.controller.surface_kind(), SurfaceKind::Cast);

        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        rig.controller.on_cast_session(CastSessionEvent::Resumed).await;
        rig.controller.sync_now_playing().await;
        assert_eq!(session.loaded(), vec!["x"]);

        let calls = rig.player.calls();
        assert!(calls.contains(&"pause".to_string()));
        assert!(calls.contains(&"muted:true".to_string()));
    }

    #[tokio::test]
    async fn test_media_error_records_and_advances() {
        let rig = rig();
        queue(&rig, &["a", "b"]).await;
        rig.controller.sync_now_playing().await;

        rig.controller
            .on_track_error(SurfaceKind::Local, "a", "video unavailable")
            .await;
        assert_eq!(rig.engine.history().latest().unwrap().video_id(), "a");
        assert_eq!(rig.engine.now_playing().unwrap().video_id(), "b");
        assert_eq!(rig.player.calls(), vec!["load:a", "load:b"]);
    }

    #[tokio::test]
    async fn test_error_on_last_track_goes_idle() {
        let rig = rig();
        queue(&rig, &["a"]).await;
        rig.controller.sync_now_playing().await;
        rig.controller
            .on_track_error(SurfaceKind::Local, "a", "restricted")
            .await;
        assert!(rig.engine.is_empty());
        assert_eq!(rig.controller.state(), PlaybackState::Idle);
        assert_eq!(rig.player.calls(), vec!["load:a", "stop"]);
    }

    #[tokio::test]
    async fn test_stale_and_inactive_signals_ignored() {
        let rig = rig();
        queue(&rig, &["a", "b"]).await;
        rig.controller.sync_now_playing().await;

        rig.controller.on_track_ended(SurfaceKind::Local, "b").await;
        rig.controller.on_track_ended(SurfaceKind::Cast, "a").await;
        assert_eq!(rig.engine.now_playing().unwrap().video_id(), "a");

        rig.controller.on_track_ended(SurfaceKind::Local, "a").await;
        rig.controller.on_track_ended(SurfaceKind::Local, "a").await;
        assert_eq!(rig.engine.now_playing().unwrap().video_id(), "b");
        assert_eq!(rig.engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_session_lost_resumes_locally_from_start() {
        let rig = rig();
        queue(&rig, &["x"]).await;
        rig.controller.sync_now_playing().await;
        rig.cast.connect(FakeSession::new("tv-1"));
        rig.controller.on_cast_session(CastSessionEvent::Started).await;

        rig.cast.disconnect();
        rig.controller.on_cast_session(CastSessionEvent::Lost).await;
        assert_eq!(rig.controller.surface_kind(), SurfaceKind::Local);
        assert_eq!(rig.controller.state(), PlaybackState::LocalPlaying("x".into()));
        let calls = rig.player.calls();
        assert_eq!(calls.last().unwrap(), "load:x");
        assert!(calls.contains(&"muted:false".to_string()));
    }

    #[tokio::test]
    async fn test_new_session_resends_current_track() {
        let rig = rig();
        queue(&rig, &["x"]).await;
        let first = FakeSession::new("tv-1");
        rig.cast.connect(first.clone());
        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        rig.controller.on_cast_session(CastSessionEvent::Ended).await;

        let second = FakeSession::new("tv-2");
        rig.cast.connect(second.clone());
        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        assert_eq!(first.loaded(), vec!["x"]);
        assert_eq!(second.loaded(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_cast_end_advances_on_receiver() {
        let rig = rig();
        queue(&rig, &["a", "b"]).await;
        let session = FakeSession::new("tv-1");
        rig.cast.connect(session.clone());
        rig.controller.on_cast_session(CastSessionEvent::Started).await;

        rig.controller.on_track_ended(SurfaceKind::Local, "a").await;
        assert_eq!(session.loaded(), vec!["a"]);

        rig.controller.on_track_ended(SurfaceKind::Cast, "a").await;
        assert_eq!(session.loaded(), vec!["a", "b"]);
        assert_eq!(rig.controller.state(), PlaybackState::CastPlaying("b".into()));
    }

    #[tokio::test]
    async fn test_cast_load_failure_retries_on_next_event() {
        let rig = rig();
        queue(&rig, &["a"]).await;
        let session = FakeSession::new("tv-1");
        *session.fail_loads.lock() = true;
        rig.cast.connect(session.clone());
        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        assert_eq!(rig.controller.state(), PlaybackState::CastConnecting);
        assert!(session.loaded().is_empty());

        *session.fail_loads.lock() = false;
        rig.controller.on_cast_session(CastSessionEvent::Started).await;
        assert_eq!(session.loaded(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_request_cast_without_sdk() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let notifier = Notifier::new();
        let history = Arc::new(HistoryManager::new(store.clone(), notifier.clone(), 50));
        let engine = Arc::new(QueueEngine::new(store, history, notifier.clone()));
        let controller =
            PlaybackController::new(engine, Arc::new(FakePlayer::default()), None, notifier);

        assert!(!controller.cast_available());
        assert_eq!(
            controller.request_cast().await,
            Err(KaraokeError::CastUnavailable)
        );
    }

    #[tokio::test]
    async fn test_request_cast_shows_connecting_until_failure() {
        let rig = rig();
        queue(&rig, &["a"]).await;
        rig.controller.sync_now_playing().await;

        rig.controller.request_cast().await.unwrap();
        assert_eq!(rig.controller.state(), PlaybackState::CastConnecting);

        rig.controller.on_cast_session(CastSessionEvent::StartFailed).await;
        assert_eq!(rig.controller.state(), PlaybackState::LocalPlaying("a".into()));
    }

    #[tokio::test]
    async fn test_pause_and_resume_local() {
        let rig = rig();
        queue(&rig, &["a"]).await;
        rig.controller.sync_now_playing().await;

        rig.controller.toggle().await;
        assert_eq!(rig.controller.state(), PlaybackState::LocalPaused("a".into()));
        rig.controller.toggle().await;
        assert_eq!(rig.controller.state(), PlaybackState::LocalPlaying("a".into()));
        assert_eq!(rig.player.calls(), vec!["load:a", "pause", "play"]);
    }

    #[tokio::test]
    async fn test_volume_is_clamped() {
        let rig = rig();
        rig.controller.set_volume(150).await;
        assert_eq!(rig.controller.volume(), 100);
        assert_eq!(rig.player.calls(), vec!["volume:100"]);
    }

    fn controller_for(store: Arc<dyn KaraokeStore>) -> (Arc<PlaybackController>, Arc<FakePlayer>) {
        let notifier = Notifier::new();
        let history = Arc::new(HistoryManager::new(store.clone(), notifier.clone(), 50));
        let engine = Arc::new(QueueEngine::new(store, history, notifier.clone()));
        let player = Arc::new(FakePlayer::default());
        let controller = Arc::new(PlaybackController::new(
            engine,
            player.clone(),
            None,
            notifier,
        ));
        (controller, player)
    }

    fn engine_for(store: Arc<dyn KaraokeStore>) -> QueueEngine {
        let notifier = Notifier::new();
        let history = Arc::new(HistoryManager::new(store.clone(), notifier.clone(), 50));
        QueueEngine::new(store, history, notifier)
    }

    #[tokio::test]
    async fn test_run_follows_queue_changes() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let (controller, player) = controller_for(store.clone());

        let changes = store.subscribe();
        controller.engine.enqueue(track("a"), Mode::Karaoke).await.unwrap();

        let task = tokio::spawn(controller.clone().run(changes, Duration::from_secs(3600)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(player.calls(), vec!["load:a"]);
        task.abort();
    }

    #[tokio::test]
    async fn test_run_picks_up_other_window_writes() {
        let store: Arc<dyn KaraokeStore> = Arc::new(MemoryStore::new());
        let (controller, player) = controller_for(store.clone());
        let other_window = engine_for(store.clone());

        let task = tokio::spawn(
            controller
                .clone()
                .run(store.subscribe(), Duration::from_secs(3600)),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        other_window.enqueue(track("x"), Mode::Karaoke).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(player.calls(), vec!["load:x"]);
        assert_eq!(controller.engine.len(), 1);

        // The reconciled engine appends after the other window's item.
        controller.engine.enqueue(track("y"), Mode::Karaoke).await.unwrap();
        let keys: Vec<f64> = store
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|i| i.order_key)
            .collect();
        assert_eq!(keys, vec![1.0, 2.0]);

        other_window.reconcile().await;
        other_window.advance().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(player.calls(), vec!["load:x", "load:y"]);
        task.abort();
    }

    #[tokio::test]
    async fn test_run_polls_for_other_process_writes() {
        let dir = tempfile::tempdir().unwrap();
        let ours: Arc<dyn KaraokeStore> = Arc::new(JsonFileStore::new(dir.path()).unwrap());
        let theirs: Arc<dyn KaraokeStore> = Arc::new(JsonFileStore::new(dir.path()).unwrap());
        let (controller, player) = controller_for(ours.clone());
        let other_process = engine_for(theirs);

        let task = tokio::spawn(
            controller
                .clone()
                .run(ours.subscribe(), Duration::from_millis(20)),
        );
        other_process.enqueue(track("x"), Mode::Karaoke).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(player.calls(), vec!["load:x"]);
        task.abort();
    }
}
