//! Stream token issuance contract

use async_trait::async_trait;
use hermes_core::{ScopedToken, StreamScope};

use crate::error::Result;

/// Mints short-lived, channel-scoped stream tokens.
///
/// The stream adapters consume this at construction time: one token is
/// fetched per subscription lifetime and attached to the stream URL. Tokens
/// are never renewed mid-stream; a subscription that outlives its token is
/// recreated by its owner.
///
/// [`HermesClient`](crate::HermesClient) implements this against the token
/// endpoint; tests substitute a stub.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request a token for the given channel scope with the given lifetime
    /// in seconds. The server clamps out-of-range lifetimes.
    async fn request_token(&self, scope: StreamScope, ttl: u64) -> Result<ScopedToken>;
}
