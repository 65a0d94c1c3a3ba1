//! YouTube Data API search, tagged by karaoke/original mode.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::errors::KaraokeError;
use crate::models::{Mode, Thumbnails, Track};

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Which result sets a search should produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    #[default]
    All,
    Karaoke,
    Original,
}

impl SearchFilter {
    fn modes(self) -> &'static [Mode] {
        match self {
            SearchFilter::All => &[Mode::Karaoke, Mode::Original],
            SearchFilter::Karaoke => &[Mode::Karaoke],
            SearchFilter::Original => &[Mode::Original],
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Debug)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: SnippetThumbnails,
}

#[derive(Deserialize, Debug, Default)]
struct SnippetThumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Deserialize, Debug)]
struct Thumbnail {
    url: String,
}

/// Parses a `search.list` response body into tracks tagged with `mode`.
/// Items without a video id (channels, playlists) are skipped.
pub fn parse_search_response(body: &str, mode: Mode) -> Result<Vec<Track>, KaraokeError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            let thumbs = item.snippet.thumbnails;
            Some(
                Track::new(video_id, item.snippet.title, item.snippet.channel_title, mode)
                    .with_thumbnails(Thumbnails {
                        default: thumbs.default.map(|t| t.url),
                        medium: thumbs.medium.map(|t| t.url),
                        high: thumbs.high.map(|t| t.url),
                    }),
            )
        })
        .collect())
}

/// Concatenates result sets in order, keeping the first occurrence of each
/// video id.
pub fn merge_results(sets: Vec<Vec<Track>>) -> Vec<Track> {
    let mut seen = HashSet::new();
    sets.into_iter()
        .flatten()
        .filter(|t| seen.insert(t.video_id.clone()))
        .collect()
}

pub fn query_for(query: &str, mode: Mode) -> String {
    match mode {
        Mode::Karaoke => format!("{} karaoke", query),
        Mode::Original => query.to_string(),
    }
}

pub struct YouTubeSearchClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
}

impl YouTubeSearchClient {
    pub fn new(api_key: Option<String>, max_results: u32) -> Result<Self, KaraokeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: YOUTUBE_API_BASE.to_string(),
            max_results: max_results.max(1),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Karaoke results come first when both modes are requested.
    pub async fn search(&self, query: &str, filter: SearchFilter) -> Result<Vec<Track>, KaraokeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let Some(api_key) = self.api_key.as_deref() else {
            log::error!("[Search] YouTube API key is not set");
            return Err(KaraokeError::Config("YouTube API key is not set".into()));
        };

        let mut sets = Vec::new();
        for mode in filter.modes() {
            sets.push(self.fetch(&query_for(query, *mode), *mode, api_key).await?);
        }

        let results = merge_results(sets);
        if results.is_empty() {
            log::info!("[Search] No results for '{}'", query);
        }
        Ok(results)
    }

    async fn fetch(&self, query: &str, mode: Mode, api_key: &str) -> Result<Vec<Track>, KaraokeError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let max_results = self.max_results.to_string();
        let params = [
            ("part", "snippet"),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("q", query),
            ("key", api_key),
        ];

        log::info!("[Search] Searching YouTube: '{}' ({})", query, mode);

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("[Search] YouTube request failed: {}", status);
            return Err(KaraokeError::Network(format!(
                "YouTube search returned {}",
                status
            )));
        }

        parse_search_response(&body, mode)
    }
}
