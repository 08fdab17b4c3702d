//! Hermes HTTP client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use hermes_core::{
    clamp_ttl, CacheConsumer, CreateTokenRequest, ScopedToken, StreamHealth, StreamScope,
    TokenResponse,
};

use crate::error::{HermesClientError, Result};
use crate::streaming::{DownloadSubscription, QueueSubscription, StatsSubscription};
use crate::token::TokenProvider;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Hermes REST API client
///
/// Covers the surface the stream adapters need: token issuance, health
/// probes, and subscription construction.
#[derive(Debug, Clone)]
pub struct HermesClient {
    client: Client,
    base_url: Url,
}

impl HermesClient {
    /// Create a new Hermes client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Hermes server (e.g., "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new Hermes client with custom configuration
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Create a new Hermes client that sends a bearer token with every request.
    ///
    /// The token endpoint requires authentication; the minted stream tokens
    /// themselves travel in the stream URL instead.
    pub fn with_bearer_token(base_url: &str, token: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let header_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| HermesClientError::ParseError(format!("Invalid auth token: {}", e)))?;
        headers.insert(reqwest::header::AUTHORIZATION, header_value);

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get a reference to the underlying HTTP client.
    ///
    /// The stream adapters reuse it for the connection pool and default
    /// headers. Note that SSE requests must not inherit the request
    /// timeout, so streams are opened through a separate untimed client,
    /// see [`stream_http_client`](Self::stream_http_client).
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Build an HTTP client suitable for long-lived stream requests.
    ///
    /// A total-request timeout would kill a healthy stream, so only the
    /// connect timeout is kept.
    pub fn stream_http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(Into::into)
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check server health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let url = self.base_url.join("/health")?;
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Get event-stream health metrics (active connections per channel)
    #[instrument(skip(self))]
    pub async fn stream_health(&self) -> Result<StreamHealth> {
        let url = self.base_url.join("/api/v1/events/health")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Stream Tokens
    // =========================================================================

    /// Mint a short-lived, channel-scoped stream token
    #[instrument(skip(self))]
    pub async fn create_stream_token(&self, request: &CreateTokenRequest) -> Result<TokenResponse> {
        let url = self.base_url.join("/api/v1/events/token")?;
        debug!("Requesting stream token for scope {}", request.scope);

        let response = self.client.post(url).json(request).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribe to one download's progress channel
    #[instrument(skip(self, cache))]
    pub async fn subscribe_download(
        &self,
        download_id: &str,
        cache: Arc<dyn CacheConsumer>,
    ) -> Result<DownloadSubscription> {
        let http = self.stream_http_client()?;
        DownloadSubscription::open(http, &self.base_url, self, download_id, cache)
            .await
            .map_err(Into::into)
    }

    /// Subscribe to the queue channel
    #[instrument(skip(self, cache))]
    pub async fn subscribe_queue(
        &self,
        cache: Arc<dyn CacheConsumer>,
    ) -> Result<QueueSubscription> {
        let http = self.stream_http_client()?;
        QueueSubscription::open(http, &self.base_url, self, cache)
            .await
            .map_err(Into::into)
    }

    /// Subscribe to the aggregate statistics channel
    #[instrument(skip(self, cache))]
    pub async fn subscribe_stats(
        &self,
        cache: Arc<dyn CacheConsumer>,
    ) -> Result<StatsSubscription> {
        let http = self.stream_http_client()?;
        StatsSubscription::open(http, &self.base_url, self, cache)
            .await
            .map_err(Into::into)
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| HermesClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    /// Extract error from failed response
    async fn extract_error(&self, response: reqwest::Response) -> HermesClientError {
        let status = response.status();
        self.extract_error_from_status(response, status).await
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> HermesClientError {
        #[derive(serde::Deserialize)]
        struct ErrorResponse {
            detail: String,
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.detail,
            Err(_) => format!("HTTP {}", status),
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                HermesClientError::Unauthorized(message)
            }
            StatusCode::NOT_FOUND if message.contains("ownload") => {
                HermesClientError::DownloadNotFound(message)
            }
            _ => HermesClientError::server_error(status.as_u16(), message),
        }
    }
}

#[async_trait]
impl TokenProvider for HermesClient {
    async fn request_token(&self, scope: StreamScope, ttl: u64) -> Result<ScopedToken> {
        let request = CreateTokenRequest {
            scope,
            ttl: clamp_ttl(ttl),
        };
        let response = self.create_stream_token(&request).await?;
        Ok(ScopedToken::from_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HermesClient::new("http://localhost:8000");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HermesClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_bearer_token_client() {
        let client = HermesClient::with_bearer_token("http://localhost:8000", "secret");
        assert!(client.is_ok());
    }
}
