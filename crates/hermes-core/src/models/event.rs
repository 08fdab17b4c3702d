//! Event envelope types for the server-sent event channels

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::download::{DownloadProgressEvent, DownloadStatus};

/// Named event kinds carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DownloadProgress,
    QueueUpdate,
    StatsUpdate,
}

impl EventKind {
    /// Parse a wire event name, returning `None` for kinds this client
    /// does not know about
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "download_progress" => Some(Self::DownloadProgress),
            "queue_update" => Some(Self::QueueUpdate),
            "stats_update" => Some(Self::StatsUpdate),
            _ => None,
        }
    }

    /// Wire name of this event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadProgress => "download_progress",
            Self::QueueUpdate => "queue_update",
            Self::StatsUpdate => "stats_update",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What changed in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    Added,
    Removed,
    StatusChanged,
    Reordered,
    Cleared,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::StatusChanged => "status_changed",
            Self::Reordered => "reordered",
            Self::Cleared => "cleared",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Payload of a `queue_update` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueUpdateEvent {
    /// What kind of queue change occurred
    pub action: QueueAction,
    /// Download the change applies to, absent for queue-wide actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_id: Option<String>,
    /// New status, for status-change actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DownloadStatus>,
    /// Number of entries currently queued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_size: Option<u64>,
    /// When the change happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Why a stats snapshot was pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsTrigger {
    DownloadCompleted,
    StatsRefresh,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for StatsTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DownloadCompleted => "download_completed",
            Self::StatsRefresh => "stats_refresh",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Payload of a `stats_update` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsUpdateEvent {
    /// What caused the server to push fresh statistics; `event` on the wire
    #[serde(rename = "event")]
    pub trigger: StatsTrigger,
    /// Download that completed, for completion-triggered updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_id: Option<String>,
    /// When the update was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Response of the stream health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamHealth {
    /// Overall service status string
    pub status: String,
    /// Total number of live stream connections
    #[serde(default)]
    pub active_connections: u64,
    /// Connection counts per channel
    #[serde(default)]
    pub channels: HashMap<String, u64>,
}

/// A decoded event from any of the stream channels
#[derive(Debug, Clone)]
pub enum HermesEvent {
    DownloadProgress(DownloadProgressEvent),
    QueueUpdate(QueueUpdateEvent),
    StatsUpdate(StatsUpdateEvent),
}

impl HermesEvent {
    /// Decode an event payload for a known kind.
    ///
    /// Returns `None` when the event name is not one this client handles,
    /// `Some(Err(..))` when the name is known but the payload does not
    /// deserialize.
    pub fn decode(
        name: &str,
        data: &serde_json::Value,
    ) -> Option<Result<Self, serde_json::Error>> {
        let kind = EventKind::from_name(name)?;
        let decoded = match kind {
            EventKind::DownloadProgress => {
                serde_json::from_value(data.clone()).map(Self::DownloadProgress)
            }
            EventKind::QueueUpdate => serde_json::from_value(data.clone()).map(Self::QueueUpdate),
            EventKind::StatsUpdate => serde_json::from_value(data.clone()).map(Self::StatsUpdate),
        };
        Some(decoded)
    }

    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DownloadProgress(_) => EventKind::DownloadProgress,
            Self::QueueUpdate(_) => EventKind::QueueUpdate,
            Self::StatsUpdate(_) => EventKind::StatsUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(
            EventKind::from_name("download_progress"),
            Some(EventKind::DownloadProgress)
        );
        assert_eq!(EventKind::from_name("heartbeat"), None);
        assert_eq!(EventKind::QueueUpdate.as_str(), "queue_update");
    }

    #[test]
    fn test_decode_queue_update() {
        let data = json!({
            "action": "added",
            "download_id": "dl-1",
            "queue_size": 3
        });
        let event = HermesEvent::decode("queue_update", &data).unwrap().unwrap();
        match event {
            HermesEvent::QueueUpdate(update) => {
                assert_eq!(update.action, QueueAction::Added);
                assert_eq!(update.queue_size, Some(3));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_kind_is_ignored() {
        let data = json!({"anything": true});
        assert!(HermesEvent::decode("server_notice", &data).is_none());
    }

    #[test]
    fn test_decode_known_kind_bad_payload_is_error() {
        let data = json!({"status": "downloading"});
        let result = HermesEvent::decode("download_progress", &data).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_update_wire_field_names() {
        let event: StatsUpdateEvent = serde_json::from_value(json!({
            "event": "download_completed",
            "download_id": "dl-7"
        }))
        .unwrap();
        assert_eq!(event.trigger, StatsTrigger::DownloadCompleted);
        assert_eq!(event.download_id.as_deref(), Some("dl-7"));
    }

    #[test]
    fn test_stats_trigger_unknown_variant() {
        let event: StatsUpdateEvent =
            serde_json::from_value(json!({"event": "manual_poke"})).unwrap();
        assert_eq!(event.trigger, StatsTrigger::Unknown);
    }
}
