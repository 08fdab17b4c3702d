//! Streaming types and configuration

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Errors that can occur on an event stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Token could not be minted before the stream was opened
    #[error("Failed to fetch stream token: {0}")]
    TokenFetch(String),

    /// The stream request was rejected with 401 or 403
    #[error("Authentication failed (HTTP {status})")]
    AuthenticationFailed { status: u16 },

    /// Transport-level failure (connect error, reset, stream ended)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Non-success HTTP status on the stream request
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Reconnect budget exhausted
    #[error("Gave up after {attempts} reconnect attempts")]
    MaxAttemptsExceeded { attempts: u32 },

    /// Invalid stream URL
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),
}

impl StreamError {
    /// Terminal errors stop automatic reconnection for the handle;
    /// only an explicit `reconnect()` resumes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::MaxAttemptsExceeded { .. }
        )
    }
}

/// Where the connection currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No URL yet, or never asked to connect
    #[default]
    Idle,
    /// Stream request in flight
    Connecting,
    /// Live transport, events flowing
    Open,
    /// Waiting out a backoff delay after a transient failure
    Reconnecting,
    /// Closed by the owner or by handle drop
    Closed,
    /// Stopped on a terminal error
    Failed,
}

/// Snapshot of stream state, published through a watch channel
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    /// Connection lifecycle phase
    pub phase: ConnectionPhase,
    /// Most recently accepted event payload
    pub data: Option<Value>,
    /// Last error observed, cleared on a successful open
    pub error: Option<StreamError>,
    /// Reconnect attempts made since the last successful open
    pub reconnect_attempts: u32,
}

impl StreamState {
    /// Whether the transport is currently live
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }

    /// Whether a reconnect is pending
    pub fn is_reconnecting(&self) -> bool {
        self.phase == ConnectionPhase::Reconnecting
    }
}

/// An accepted, decoded message from the stream
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Named event type, when the server set one
    pub event: Option<String>,
    /// Decoded JSON payload
    pub data: Value,
}

/// Callback invoked on the stream task for every accepted message
pub type EventHandler = Box<dyn Fn(StreamMessage) + Send + Sync>;

/// Side-effect hook with no arguments
pub type StreamHook = Box<dyn Fn() + Send + Sync>;

/// Side-effect hook receiving the error that occurred
pub type ErrorHook = Box<dyn Fn(&StreamError) + Send + Sync>;

/// Default base delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Default cap on the reconnect delay
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Configuration for an [`EventStream`](super::EventStream)
pub struct StreamOptions {
    /// Reconnect automatically after transient failures
    pub reconnect: bool,
    /// Maximum reconnect attempts per outage; 0 means unlimited
    pub max_reconnect_attempts: u32,
    /// Base delay for the first reconnect attempt
    pub reconnect_delay: Duration,
    /// Upper bound on the backoff delay
    pub max_reconnect_delay: Duration,
    /// Named events to accept; empty accepts every message
    pub events: Vec<String>,
    /// Invoked each time the transport opens
    pub on_open: Option<StreamHook>,
    /// Invoked when the stream stops for good (close, drop, terminal error)
    pub on_close: Option<StreamHook>,
    /// Invoked on every connection error, transient or terminal
    pub on_error: Option<ErrorHook>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            max_reconnect_attempts: 0,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
            events: Vec::new(),
            on_open: None,
            on_close: None,
            on_error: None,
        }
    }
}

impl std::fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOptions")
            .field("reconnect", &self.reconnect)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_reconnect_delay", &self.max_reconnect_delay)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl StreamOptions {
    /// Accept only the given named events
    pub fn with_events(mut self, events: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Limit reconnect attempts per outage
    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// Set the base and maximum reconnect delays
    pub fn with_reconnect_delays(mut self, base: Duration, cap: Duration) -> Self {
        self.reconnect_delay = base;
        self.max_reconnect_delay = cap;
        self
    }

    /// Disable automatic reconnection
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect = false;
        self
    }
}

/// Delay before the Nth reconnect attempt (1-indexed): `min(base * 2^(N-1), cap)`
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    match base.checked_mul(1u32 << shift) {
        Some(delay) => delay.min(cap),
        None => cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(1, base, cap), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, base, cap), Duration::from_secs(2));
        assert_eq!(backoff_delay(3, base, cap), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, base, cap), Duration::from_secs(16));
        assert_eq!(backoff_delay(6, base, cap), Duration::from_secs(30));
        assert_eq!(backoff_delay(100, base, cap), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_zero_attempt_uses_base() {
        let base = Duration::from_millis(500);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(0, base, cap), base);
        assert_eq!(backoff_delay(1, base, cap), base);
    }

    #[test]
    fn test_terminal_classification() {
        assert!(StreamError::AuthenticationFailed { status: 401 }.is_terminal());
        assert!(StreamError::MaxAttemptsExceeded { attempts: 3 }.is_terminal());
        assert!(!StreamError::Connection("reset".into()).is_terminal());
        assert!(!StreamError::Server {
            status: 500,
            message: "oops".into()
        }
        .is_terminal());
    }

    #[test]
    fn test_state_accessors() {
        let mut state = StreamState::default();
        assert!(!state.is_connected());
        state.phase = ConnectionPhase::Open;
        assert!(state.is_connected());
        state.phase = ConnectionPhase::Reconnecting;
        assert!(state.is_reconnecting());
    }
}
