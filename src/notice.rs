//! User-facing, non-blocking notifications (the UI renders these as toasts).

use serde::Serialize;
use tokio::sync::broadcast;

const NOTICE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

/// Cloneable sender side of the notice channel. Sending with no
/// subscribers is fine; the notice is dropped.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(NoticeLevel::Info, title.into(), message.into());
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(NoticeLevel::Warning, title.into(), message.into());
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(NoticeLevel::Error, title.into(), message.into());
    }

    fn send(&self, level: NoticeLevel, title: String, message: String) {
        let _ = self.tx.send(Notice {
            level,
            title,
            message,
        });
    }
}
