//! Download progress models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Processing,
    Completed,
    Failed,
    Cancelled,
    /// Status strings this client does not know about
    #[serde(other)]
    Unknown,
}

impl DownloadStatus {
    /// Wire name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the transfer is in an active phase (bytes still moving)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Downloading | Self::Processing)
    }

    /// Whether the download has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw progress numbers for one download, replaced wholesale on each event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgressInfo {
    /// Download percentage (0-100); may regress between fragments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Bytes downloaded so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    /// Total bytes to download, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Download speed in bytes per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Estimated seconds remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
}

/// Payload of a `download_progress` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgressEvent {
    /// Download identifier
    pub download_id: String,
    /// Current download status
    pub status: DownloadStatus,
    /// Progress numbers; null while the worker has nothing to report
    #[serde(default)]
    pub progress: Option<ProgressInfo>,
    /// Result payload once the download finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// File currently being written (playlists switch mid-download)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_filename: Option<String>,
    /// Human-readable status message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error message for failed downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the download was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DownloadProgressEvent {
    /// Percentage reported by this event, if any
    pub fn percentage(&self) -> Option<f64> {
        self.progress.as_ref().and_then(|p| p.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        let s: DownloadStatus = serde_json::from_str("\"downloading\"").unwrap();
        assert_eq!(s, DownloadStatus::Downloading);
        assert!(s.is_active());
        assert!(!s.is_terminal());
    }

    #[test]
    fn test_unknown_status_does_not_fail() {
        let s: DownloadStatus = serde_json::from_str("\"transcoding\"").unwrap();
        assert_eq!(s, DownloadStatus::Unknown);
        assert!(!s.is_active());
    }

    #[test]
    fn test_progress_event_minimal() {
        let json = r#"{"download_id":"abc-123","status":"queued","progress":null}"#;
        let event: DownloadProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.download_id, "abc-123");
        assert_eq!(event.status, DownloadStatus::Queued);
        assert!(event.progress.is_none());
        assert_eq!(event.percentage(), None);
    }

    #[test]
    fn test_progress_event_full() {
        let json = r#"{
            "download_id": "abc-123",
            "status": "downloading",
            "progress": {
                "percentage": 42.5,
                "downloaded_bytes": 1024,
                "total_bytes": 4096,
                "speed": 512.0,
                "eta": 6.0
            },
            "current_filename": "video.mp4",
            "message": "Downloading video"
        }"#;
        let event: DownloadProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.percentage(), Some(42.5));
        assert_eq!(event.progress.as_ref().unwrap().total_bytes, Some(4096));
        assert_eq!(event.current_filename.as_deref(), Some("video.mp4"));
    }
}
