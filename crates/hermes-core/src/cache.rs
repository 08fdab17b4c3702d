//! Cache-consumer contract and an in-memory implementation
//!
//! Stream adapters keep a local cache of server state in sync with the
//! event channels: fresh payloads are written through, and events that only
//! signal "something changed" invalidate the affected entries so the next
//! read refetches.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde_json::Value;

/// Keys for the cached server-state entries the event channels touch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Current queue listing
    Queue,
    /// Aggregate statistics snapshot
    Stats,
    /// Historical analytics rollups
    Analytics,
    /// Activity timeline
    Timeline,
    /// Progress state for a single download
    DownloadProgress(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue => f.write_str("queue"),
            Self::Stats => f.write_str("stats"),
            Self::Analytics => f.write_str("analytics"),
            Self::Timeline => f.write_str("timeline"),
            Self::DownloadProgress(id) => write!(f, "download-progress:{id}"),
        }
    }
}

/// Sink for cache writes driven by stream events.
///
/// Implementations must be cheap to call from the stream task; both
/// operations are fire-and-forget from the adapter's point of view.
pub trait CacheConsumer: Send + Sync {
    /// Store a fresh value for a key
    fn set(&self, key: CacheKey, value: Value);

    /// Drop a key so the next reader refetches it
    fn invalidate(&self, key: &CacheKey);
}

/// Simple in-memory cache backed by a hash map
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a cached value, if present
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheConsumer for MemoryCache {
    fn set(&self, key: CacheKey, value: Value) {
        self.entries.write().insert(key, value);
    }

    fn invalidate(&self, key: &CacheKey) {
        self.entries.write().remove(key);
    }
}
