//! Server-sent event streaming
//!
//! A reconnecting SSE client for the Hermes event channels. The wire parser
//! lives in [`parser`], the connection state machine in [`stream`], and the
//! channel-specific adapters (download progress, queue, stats) in
//! [`subscription`].

mod parser;
mod stream;
pub mod subscription;
mod types;

pub use parser::{SseFrame, SseParser};
pub use stream::EventStream;
pub use subscription::{DownloadSubscription, QueueSubscription, StatsSubscription};
pub use types::{
    backoff_delay, ConnectionPhase, EventHandler, StreamError, StreamMessage, StreamOptions,
    StreamResult, StreamState,
};
