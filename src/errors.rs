use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize, Clone, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum KaraokeError {
    #[error("Already in queue: {0}")]
    DuplicateEnqueue(String),

    #[error("Not in queue: {0}")]
    NotInQueue(String),

    #[error("Media playback error: {0}")]
    MediaPlayback(String),

    #[error("Casting is not available")]
    CastUnavailable,

    #[error("Cast error: {0}")]
    Cast(String),

    #[error("Storage unavailable: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Conversions for the error types the adapters run into

impl From<sqlx::Error> for KaraokeError {
    fn from(e: sqlx::Error) -> Self {
        KaraokeError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for KaraokeError {
    fn from(e: std::io::Error) -> Self {
        KaraokeError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for KaraokeError {
    fn from(e: reqwest::Error) -> Self {
        KaraokeError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for KaraokeError {
    fn from(e: serde_json::Error) -> Self {
        KaraokeError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<String> for KaraokeError {
    fn from(e: String) -> Self {
        KaraokeError::Internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let err = KaraokeError::DuplicateEnqueue("abc".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "DuplicateEnqueue");
        assert_eq!(json["message"], "abc");
    }

    #[test]
    fn test_unit_variant_has_no_message() {
        let json = serde_json::to_value(KaraokeError::CastUnavailable).unwrap();
        assert_eq!(json["type"], "CastUnavailable");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(KaraokeError::from(io), KaraokeError::Storage(_)));
    }
}
