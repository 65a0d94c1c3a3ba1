use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Karaoke,
    Original,
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Karaoke => "karaoke",
            Mode::Original => "original",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "karaoke" => Ok(Mode::Karaoke),
            "original" | "non-karaoke" => Ok(Mode::Original),
            _ => Err(format!("Invalid mode: {}", s)),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
}

impl Thumbnails {
    /// Largest available thumbnail.
    pub fn best(&self) -> Option<&str> {
        self.high
            .as_deref()
            .or(self.medium.as_deref())
            .or(self.default.as_deref())
    }
}

/// A playable YouTube video. Identity is `video_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub mode: Mode,
}

impl Track {
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        channel_title: impl Into<String>,
        mode: Mode,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            channel_title: channel_title.into(),
            thumbnails: Thumbnails::default(),
            mode,
        }
    }

    pub fn with_thumbnails(mut self, thumbnails: Thumbnails) -> Self {
        self.thumbnails = thumbnails;
        self
    }
}

/// A track placed in the play queue. The item with the lowest
/// `order_key` is the one playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub track: Track,
    pub mode: Mode,
    pub order_key: f64,
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(track: Track, mode: Mode, order_key: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            track,
            mode,
            order_key,
            added_at: Utc::now(),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.track.video_id
    }
}

/// Sorts queue items by order key, lowest first.
pub fn sort_by_order_key(items: &mut [QueueItem]) {
    items.sort_by(|a, b| a.order_key.total_cmp(&b.order_key));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_json_shape() {
        let track = Track::new("dQw4w9WgXcQ", "Song", "Channel", Mode::Original);
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["channelTitle"], "Channel");
        assert_eq!(json["mode"], "original");
    }

    #[test]
    fn test_queue_item_json_shape() {
        let item = QueueItem::new(Track::new("a", "A", "C", Mode::Karaoke), Mode::Karaoke, 2.5);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["orderKey"], 2.5);
        assert!(json["addedAt"].is_string());
        assert_eq!(json["track"]["videoId"], "a");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Karaoke".parse::<Mode>(), Ok(Mode::Karaoke));
        assert_eq!("non-karaoke".parse::<Mode>(), Ok(Mode::Original));
        assert!("live".parse::<Mode>().is_err());
    }

    #[test]
    fn test_best_thumbnail_prefers_high() {
        let thumbs = Thumbnails {
            default: Some("d".into()),
            medium: Some("m".into()),
            high: None,
        };
        assert_eq!(thumbs.best(), Some("m"));
    }

    #[test]
    fn test_sort_by_order_key() {
        let t = |id: &str| Track::new(id, id, "c", Mode::Karaoke);
        let mut items = vec![
            QueueItem::new(t("b"), Mode::Karaoke, 2.0),
            QueueItem::new(t("a"), Mode::Karaoke, -1.0),
            QueueItem::new(t("c"), Mode::Karaoke, 1.5),
        ];
        sort_by_order_key(&mut items);
        let ids: Vec<&str> = items.iter().map(|i| i.video_id()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }
}
