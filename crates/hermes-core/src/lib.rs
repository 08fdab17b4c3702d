//! hermes-core - Shared models and contracts for Hermes stream consumers
//!
//! This crate provides the types shared between the event-stream client, the
//! subscription adapters, and anything that renders download state: event
//! payload models, stream scopes and tokens, the cache-consumer contract,
//! and the monotonic progress smoother.

pub mod cache;
pub mod error;
pub mod models;
pub mod progress;

pub use cache::{CacheConsumer, CacheKey, MemoryCache};
pub use error::{CoreError, CoreResult};
pub use models::*;
pub use progress::{display_percentage, MonotonicProgress};
