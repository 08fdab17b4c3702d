//! Hermes Client Library
//!
//! Provides a typed HTTP client for the Hermes download service plus a
//! reconnecting server-sent-event client for its real-time channels.
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_client::HermesClient;
//! use hermes_core::{CacheConsumer, MemoryCache};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HermesClient::new("http://localhost:8000")?;
//!     let cache: Arc<dyn CacheConsumer> = Arc::new(MemoryCache::new());
//!
//!     // Follow one download's progress
//!     let sub = client.subscribe_download("abc-123", cache.clone()).await?;
//!     let mut events = sub.events();
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{}: {:?}", event.download_id, event.percentage());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides utilities for integration testing:
//!
//! ```rust,ignore
//! use hermes_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let health = server.client.health().await?;
//! ```

mod client;
mod error;
pub mod streaming;
pub mod testing;
mod token;

pub use client::HermesClient;
pub use error::{HermesClientError, Result};
pub use token::TokenProvider;

// Re-export streaming types for convenience
pub use streaming::{
    ConnectionPhase, DownloadSubscription, EventStream, QueueSubscription, StatsSubscription,
    StreamError, StreamMessage, StreamOptions, StreamState,
};

// Re-export core types for convenience
pub use hermes_core::models::{
    DownloadProgressEvent, DownloadStatus, QueueUpdateEvent, ScopedToken, StatsUpdateEvent,
    StreamHealth, StreamScope,
};
