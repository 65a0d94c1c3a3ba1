use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::search::DEFAULT_MAX_RESULTS;

pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";
const APP_DIR: &str = "karaoke";

/// Where the queue, history and favorites live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Json,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KaraokeConfig {
    pub youtube_api_key: Option<String>,
    pub search_max_results: u32,
    pub history_limit: usize,
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    /// How often the monitor re-reads shared storage.
    pub monitor_poll_ms: u64,
}

impl Default for KaraokeConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            search_max_results: DEFAULT_MAX_RESULTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            storage: StorageBackend::default(),
            data_dir: default_data_dir(),
            monitor_poll_ms: 1000,
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

impl KaraokeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Missing file gives defaults; an unreadable one is logged and also
    /// gives defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[Config] {:#}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_api_key_override(std::env::var(API_KEY_ENV).ok())
    }

    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.youtube_api_key = Some(key);
        }
        self
    }

    pub fn monitor_poll(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.monitor_poll_ms.max(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_reasonable_values() {
        let config = KaraokeConfig::default();
        assert_eq!(config.youtube_api_key, None);
        assert_eq!(config.search_max_results, 10);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert!(config.data_dir.ends_with("karaoke"));
        assert_eq!(config.monitor_poll().as_millis(), 1000);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = KaraokeConfig {
            youtube_api_key: Some("key".into()),
            storage: StorageBackend::Json,
            data_dir: dir.path().to_path_buf(),
            ..KaraokeConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(KaraokeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage":"memory","historyLimit":5}"#).unwrap();

        let config = KaraokeConfig::load(&path).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.search_max_results, 10);
    }

    #[test]
    fn load_or_default_tolerates_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(KaraokeConfig::load_or_default(&missing), KaraokeConfig::default());

        let invalid = dir.path().join("config.json");
        std::fs::write(&invalid, "not json").unwrap();
        assert!(KaraokeConfig::load(&invalid).is_err());
        assert_eq!(KaraokeConfig::load_or_default(&invalid), KaraokeConfig::default());
    }

    #[test]
    fn blank_override_keeps_configured_key() {
        let config = KaraokeConfig {
            youtube_api_key: Some("file-key".into()),
            ..KaraokeConfig::default()
        };
        let config = config.with_api_key_override(Some(" ".into()));
        assert_eq!(config.youtube_api_key.as_deref(), Some("file-key"));
        let config = config.with_api_key_override(Some("env-key".into()));
        assert_eq!(config.youtube_api_key.as_deref(), Some("env-key"));
    }
}
