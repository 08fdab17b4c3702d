//! Stream scopes and short-lived access tokens

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Minimum token lifetime the server accepts, in seconds
pub const MIN_TOKEN_TTL: u64 = 60;
/// Maximum token lifetime the server accepts, in seconds
pub const MAX_TOKEN_TTL: u64 = 3600;
/// Default lifetime requested for stream tokens, in seconds
pub const DEFAULT_STREAM_TOKEN_TTL: u64 = 600;

/// Clamp a requested TTL into the range the server accepts
pub fn clamp_ttl(ttl: u64) -> u64 {
    ttl.clamp(MIN_TOKEN_TTL, MAX_TOKEN_TTL)
}

/// Channel a stream token grants access to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamScope {
    /// Progress events for a single download
    Download(String),
    /// Queue membership changes
    Queue,
    /// Aggregate statistics updates
    Stats,
}

impl StreamScope {
    /// Scope for a single download's progress channel
    pub fn download(id: impl Into<String>) -> Self {
        Self::Download(id.into())
    }
}

impl fmt::Display for StreamScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download(id) => write!(f, "download:{id}"),
            Self::Queue => f.write_str("queue"),
            Self::Stats => f.write_str("stats"),
        }
    }
}

impl FromStr for StreamScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(Self::Queue),
            "stats" => Ok(Self::Stats),
            other => match other.strip_prefix("download:") {
                Some("") => Err(CoreError::EmptyDownloadId),
                Some(id) => Ok(Self::Download(id.to_string())),
                None => Err(CoreError::InvalidScope(other.to_string())),
            },
        }
    }
}

impl Serialize for StreamScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StreamScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Request body for minting a stream token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    /// Channel the token should grant access to
    pub scope: StreamScope,
    /// Requested lifetime in seconds; the server clamps out-of-range values
    pub ttl: u64,
}

impl CreateTokenRequest {
    pub fn new(scope: StreamScope) -> Self {
        Self {
            scope,
            ttl: DEFAULT_STREAM_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = clamp_ttl(ttl);
        self
    }
}

/// Server response when a stream token is minted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque token value, passed as the `token` query parameter
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// Channel the token is valid for
    pub scope: StreamScope,
    /// Permissions attached to the token
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Granted lifetime in seconds, after server-side clamping
    pub ttl: u64,
}

/// A minted token together with its scope, ready to attach to a stream URL
#[derive(Debug, Clone)]
pub struct ScopedToken {
    pub value: String,
    pub scope: StreamScope,
    pub expires_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl ScopedToken {
    pub fn from_response(response: TokenResponse) -> Self {
        Self {
            value: response.token,
            scope: response.scope,
            expires_at: response.expires_at,
            ttl_seconds: response.ttl,
        }
    }

    /// Whether the token has passed its expiry time
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
