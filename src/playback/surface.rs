//! Narrow capabilities over the embedded video player and the cast SDK.
//! The controller only talks to these traits, never to SDK shapes.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::KaraokeError;
use crate::models::Track;

pub const YOUTUBE_CONTENT_TYPE: &str = "video/x-youtube";

/// The embedded player in the main window.
pub trait LocalPlayer: Send + Sync {
    /// Load and start `track` from the beginning.
    fn load(&self, track: &Track);

    fn play(&self);

    fn pause(&self);

    fn stop(&self);

    fn seek(&self, position_secs: f64);

    /// Volume 0-100.
    fn set_volume(&self, volume: u8);

    fn set_muted(&self, muted: bool);
}

/// Load request for the default media receiver.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMedia {
    pub content_id: String,
    pub content_type: String,
    pub title: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub autoplay: bool,
    pub start_time: f64,
}

impl CastMedia {
    pub fn from_track(track: &Track) -> Self {
        Self {
            content_id: track.video_id.clone(),
            content_type: YOUTUBE_CONTENT_TYPE.to_string(),
            title: track.title.clone(),
            artist: track.channel_title.clone(),
            image_url: track.thumbnails.best().map(str::to_string),
            autoplay: true,
            start_time: 0.0,
        }
    }
}

/// A connected cast session and its media session controls.
#[async_trait]
pub trait CastSession: Send + Sync {
    fn id(&self) -> String;

    async fn load_media(&self, media: CastMedia) -> Result<(), KaraokeError>;

    async fn play(&self) -> Result<(), KaraokeError>;

    async fn pause(&self) -> Result<(), KaraokeError>;

    async fn stop(&self) -> Result<(), KaraokeError>;

    async fn seek(&self, position_secs: f64) -> Result<(), KaraokeError>;

    /// Volume 0.0-1.0, as the receiver expects.
    async fn set_volume(&self, level: f32) -> Result<(), KaraokeError>;
}

/// The cast SDK entry point.
#[async_trait]
pub trait CastContext: Send + Sync {
    /// False when the SDK is not loaded or not supported.
    fn is_available(&self) -> bool;

    fn current_session(&self) -> Option<Arc<dyn CastSession>>;

    /// Asks the user to pick a receiver. Completion is reported later as a
    /// session state change.
    async fn request_session(&self) -> Result<(), KaraokeError>;
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Recording fakes for the player and cast capabilities.

    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct FakePlayer {
        pub calls: Mutex<Vec<String>>,
    }

    impl FakePlayer {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().push(call);
        }
    }

    impl LocalPlayer for FakePlayer {
        fn load(&self, track: &Track) {
            self.push(format!("load:{}", track.video_id));
        }
        fn play(&self) {
            self.push("play".into());
        }
        fn pause(&self) {
            self.push("pause".into());
        }
        fn stop(&self) {
            self.push("stop".into());
        }
        fn seek(&self, position_secs: f64) {
            self.push(format!("seek:{}", position_secs));
        }
        fn set_volume(&self, volume: u8) {
            self.push(format!("volume:{}", volume));
        }
        fn set_muted(&self, muted: bool) {
            self.push(format!("muted:{}", muted));
        }
    }

    pub struct FakeSession {
        pub session_id: String,
        pub loaded: Mutex<Vec<String>>,
        pub fail_loads: Mutex<bool>,
    }

    impl FakeSession {
        pub fn new(session_id: &str) -> Arc<Self> {
            Arc::new(Self {
                session_id: session_id.to_string(),
                loaded: Mutex::new(Vec::new()),
                fail_loads: Mutex::new(false),
            })
        }

        pub fn loaded(&self) -> Vec<String> {
            self.loaded.lock().clone()
        }
    }

    #[async_trait]
    impl CastSession for FakeSession {
        fn id(&self) -> String {
            self.session_id.clone()
        }
        async fn load_media(&self, media: CastMedia) -> Result<(), KaraokeError> {
            if *self.fail_loads.lock() {
                return Err(KaraokeError::Cast("LOAD_FAILED".into()));
            }
            self.loaded.lock().push(media.content_id);
            Ok(())
        }
        async fn play(&self) -> Result<(), KaraokeError> {
            Ok(())
        }
        async fn pause(&self) -> Result<(), KaraokeError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), KaraokeError> {
            Ok(())
        }
        async fn seek(&self, _position_secs: f64) -> Result<(), KaraokeError> {
            Ok(())
        }
        async fn set_volume(&self, _level: f32) -> Result<(), KaraokeError> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeCastContext {
        pub available: bool,
        pub session: Mutex<Option<Arc<FakeSession>>>,
    }

    impl FakeCastContext {
        pub fn available() -> Arc<Self> {
            Arc::new(Self {
                available: true,
                session: Mutex::new(None),
            })
        }

        pub fn connect(&self, session: Arc<FakeSession>) {
            *self.session.lock() = Some(session);
        }

        pub fn disconnect(&self) {
            *self.session.lock() = None;
        }
    }

    #[async_trait]
    impl CastContext for FakeCastContext {
        fn is_available(&self) -> bool {
            self.available
        }
        fn current_session(&self) -> Option<Arc<dyn CastSession>> {
            self.session
                .lock()
                .clone()
                .map(|s| s as Arc<dyn CastSession>)
        }
        async fn request_session(&self) -> Result<(), KaraokeError> {
            Ok(())
        }
    }
}
