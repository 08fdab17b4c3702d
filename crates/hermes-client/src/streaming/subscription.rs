//! Channel subscription adapters
//!
//! One adapter per event channel. All three share the same shape: mint a
//! token for the channel's scope, build the stream URL with the token in
//! the `token` query parameter, open an [`EventStream`] filtered to the
//! channel's event name, and forward each decoded event to the cache
//! consumer and to a broadcast channel for in-process consumers.
//!
//! Dropping an adapter closes its stream.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::broadcast;
use tracing::warn;
use url::Url;

use hermes_core::{
    CacheConsumer, CacheKey, DownloadProgressEvent, HermesEvent, QueueUpdateEvent, ScopedToken,
    StatsUpdateEvent, StreamScope, DEFAULT_STREAM_TOKEN_TTL,
};

use super::stream::EventStream;
use super::types::{EventHandler, StreamError, StreamOptions, StreamResult, StreamState};
use crate::token::TokenProvider;

/// Buffered events per subscription before slow receivers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Attach a stream token to an endpoint path
fn stream_url(base: &Url, path: &str, token: &str) -> StreamResult<Url> {
    let mut url = base
        .join(path)
        .map_err(|e| StreamError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Live subscription to one download's progress channel.
///
/// Each `download_progress` event is written into the cache as the full
/// progress snapshot for the download, then fanned out to subscribers.
pub struct DownloadSubscription {
    download_id: String,
    token: ScopedToken,
    stream: EventStream,
    events: broadcast::Sender<DownloadProgressEvent>,
}

impl DownloadSubscription {
    /// Mint a `download:<id>` token and open the progress stream
    pub async fn open(
        http: Client,
        base_url: &Url,
        tokens: &dyn TokenProvider,
        download_id: &str,
        cache: Arc<dyn CacheConsumer>,
    ) -> StreamResult<Self> {
        let token = tokens
            .request_token(StreamScope::download(download_id), DEFAULT_STREAM_TOKEN_TTL)
            .await
            .map_err(|e| StreamError::TokenFetch(e.to_string()))?;

        let url = stream_url(
            base_url,
            &format!("/api/v1/events/downloads/{download_id}"),
            &token.value,
        )?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let handler: EventHandler = {
            let tx = event_tx.clone();
            let id = download_id.to_string();
            Box::new(move |msg| {
                let name = msg.event.as_deref().unwrap_or("");
                match HermesEvent::decode(name, &msg.data) {
                    Some(Ok(HermesEvent::DownloadProgress(event))) => {
                        cache.set(CacheKey::DownloadProgress(id.clone()), msg.data.clone());
                        let _ = tx.send(event);
                    }
                    Some(Err(e)) => warn!("Bad download_progress payload: {}", e),
                    _ => {}
                }
            })
        };

        let options = StreamOptions::default().with_events(["download_progress"]);
        let stream = EventStream::open(http, Some(url), options, handler);

        Ok(Self {
            download_id: download_id.to_string(),
            token,
            stream,
            events: event_tx,
        })
    }

    /// Download this subscription follows
    pub fn download_id(&self) -> &str {
        &self.download_id
    }

    /// Token the stream was opened with
    pub fn token(&self) -> &ScopedToken {
        &self.token
    }

    /// Receive decoded progress events
    pub fn events(&self) -> broadcast::Receiver<DownloadProgressEvent> {
        self.events.subscribe()
    }

    /// The underlying stream handle
    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Snapshot of the stream state
    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    /// Close the stream. Idempotent.
    pub fn close(&self) {
        self.stream.close();
    }
}

/// Live subscription to the queue channel.
///
/// Queue events only signal that something changed; the adapter invalidates
/// the affected cache entries so the next read refetches.
pub struct QueueSubscription {
    token: ScopedToken,
    stream: EventStream,
    events: broadcast::Sender<QueueUpdateEvent>,
}

impl QueueSubscription {
    /// Mint a `queue` token and open the queue stream
    pub async fn open(
        http: Client,
        base_url: &Url,
        tokens: &dyn TokenProvider,
        cache: Arc<dyn CacheConsumer>,
    ) -> StreamResult<Self> {
        let token = tokens
            .request_token(StreamScope::Queue, DEFAULT_STREAM_TOKEN_TTL)
            .await
            .map_err(|e| StreamError::TokenFetch(e.to_string()))?;

        let url = stream_url(base_url, "/api/v1/events/queue", &token.value)?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let handler: EventHandler = {
            let tx = event_tx.clone();
            Box::new(move |msg| {
                let name = msg.event.as_deref().unwrap_or("");
                match HermesEvent::decode(name, &msg.data) {
                    Some(Ok(HermesEvent::QueueUpdate(event))) => {
                        cache.invalidate(&CacheKey::Queue);
                        cache.invalidate(&CacheKey::Stats);
                        if let Some(id) = &event.download_id {
                            cache.invalidate(&CacheKey::DownloadProgress(id.clone()));
                        }
                        let _ = tx.send(event);
                    }
                    Some(Err(e)) => warn!("Bad queue_update payload: {}", e),
                    _ => {}
                }
            })
        };

        let options = StreamOptions::default().with_events(["queue_update"]);
        let stream = EventStream::open(http, Some(url), options, handler);

        Ok(Self {
            token,
            stream,
            events: event_tx,
        })
    }

    /// Token the stream was opened with
    pub fn token(&self) -> &ScopedToken {
        &self.token
    }

    /// Receive decoded queue events
    pub fn events(&self) -> broadcast::Receiver<QueueUpdateEvent> {
        self.events.subscribe()
    }

    /// The underlying stream handle
    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Snapshot of the stream state
    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    /// Close the stream. Idempotent.
    pub fn close(&self) {
        self.stream.close();
    }
}

/// Live subscription to the aggregate statistics channel.
///
/// Stats events invalidate every derived rollup so dashboards refetch.
pub struct StatsSubscription {
    token: ScopedToken,
    stream: EventStream,
    events: broadcast::Sender<StatsUpdateEvent>,
}

impl StatsSubscription {
    /// Mint a `stats` token and open the stats stream
    pub async fn open(
        http: Client,
        base_url: &Url,
        tokens: &dyn TokenProvider,
        cache: Arc<dyn CacheConsumer>,
    ) -> StreamResult<Self> {
        let token = tokens
            .request_token(StreamScope::Stats, DEFAULT_STREAM_TOKEN_TTL)
            .await
            .map_err(|e| StreamError::TokenFetch(e.to_string()))?;

        let url = stream_url(base_url, "/api/v1/events/stats", &token.value)?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let handler: EventHandler = {
            let tx = event_tx.clone();
            Box::new(move |msg| {
                let name = msg.event.as_deref().unwrap_or("");
                match HermesEvent::decode(name, &msg.data) {
                    Some(Ok(HermesEvent::StatsUpdate(event))) => {
                        cache.invalidate(&CacheKey::Stats);
                        cache.invalidate(&CacheKey::Analytics);
                        cache.invalidate(&CacheKey::Timeline);
                        let _ = tx.send(event);
                    }
                    Some(Err(e)) => warn!("Bad stats_update payload: {}", e),
                    _ => {}
                }
            })
        };

        let options = StreamOptions::default().with_events(["stats_update"]);
        let stream = EventStream::open(http, Some(url), options, handler);

        Ok(Self {
            token,
            stream,
            events: event_tx,
        })
    }

    /// Token the stream was opened with
    pub fn token(&self) -> &ScopedToken {
        &self.token
    }

    /// Receive decoded stats events
    pub fn events(&self) -> broadcast::Receiver<StatsUpdateEvent> {
        self.events.subscribe()
    }

    /// The underlying stream handle
    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Snapshot of the stream state
    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    /// Close the stream. Idempotent.
    pub fn close(&self) {
        self.stream.close();
    }
}
