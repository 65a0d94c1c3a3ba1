use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Mode, Track};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub track: Track,
    pub played_at: DateTime<Utc>,
    pub mode: Mode,
}

impl HistoryEntry {
    pub fn video_id(&self) -> &str {
        &self.track.video_id
    }
}
