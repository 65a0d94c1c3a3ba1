use serde::Serialize;
use std::sync::Arc;

use super::surface::CastSession;

/// Which surface owns playback, as exposed to the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Local,
    Cast,
}

/// Playback state across the local player and the cast receiver.
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "videoId")]
pub enum PlaybackState {
    #[default]
    Idle,
    LocalPlaying(String),
    LocalPaused(String),
    CastConnecting,
    CastPlaying(String),
    CastPaused(String),
}

impl PlaybackState {
    pub fn video_id(&self) -> Option<&str> {
        match self {
            PlaybackState::LocalPlaying(id)
            | PlaybackState::LocalPaused(id)
            | PlaybackState::CastPlaying(id)
            | PlaybackState::CastPaused(id) => Some(id),
            PlaybackState::Idle | PlaybackState::CastConnecting => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self,
            PlaybackState::LocalPlaying(_) | PlaybackState::CastPlaying(_)
        )
    }

    pub fn is_casting(&self) -> bool {
        matches!(
            self,
            PlaybackState::CastConnecting
                | PlaybackState::CastPlaying(_)
                | PlaybackState::CastPaused(_)
        )
    }
}

/// Cast SDK session state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastSessionEvent {
    Starting,
    Started,
    StartFailed,
    Resumed,
    Ending,
    Ended,
    Lost,
}

/// Owner of playback. The cast variant holds the live session handle.
#[derive(Clone, Default)]
pub enum Surface {
    #[default]
    Local,
    Cast(Arc<dyn CastSession>),
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Local => SurfaceKind::Local,
            Surface::Cast(_) => SurfaceKind::Cast,
        }
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Surface::Local => write!(f, "Local"),
            Surface::Cast(session) => write!(f, "Cast({})", session.id()),
        }
    }
}

/// Ephemeral playback bookkeeping. Never persisted.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub surface: Surface,
    pub state: PlaybackState,
    /// Last video sent to the receiver during the current cast session.
    pub last_cast_video_id: Option<String>,
    pub volume: u8,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            surface: Surface::Local,
            state: PlaybackState::Idle,
            last_cast_video_id: None,
            volume: 50,
        }
    }
}
