//! Integration tests for the channel subscription adapters and the token
//! endpoint wiring

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use chrono::Utc;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;

use hermes_client::testing::{wait_for, TestServer};
use hermes_client::{
    DownloadStatus, HermesClientError, ScopedToken, StreamError, StreamScope, TokenProvider,
};
use hermes_core::{
    CacheConsumer, CacheKey, CreateTokenRequest, MemoryCache, StatsTrigger, TokenResponse,
};

const WAIT: Duration = Duration::from_secs(5);

/// SSE response that sends the given frames and then stays open
fn sse_response(frames: &str) -> Response {
    let chunk = Ok::<_, std::convert::Infallible>(Bytes::from(frames.to_string()));
    let body = Body::from_stream(futures::stream::iter([chunk]).chain(futures::stream::pending()));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

/// Token endpoint that records requests and mints a fixed token
fn token_route(
    token_requests: Arc<Mutex<Vec<CreateTokenRequest>>>,
) -> axum::routing::MethodRouter {
    post(move |Json(request): Json<CreateTokenRequest>| {
        let token_requests = token_requests.clone();
        async move {
            let scope = request.scope.clone();
            token_requests.lock().push(request);
            Json(TokenResponse {
                token: "tok-abc".into(),
                expires_at: Utc::now() + chrono::Duration::seconds(600),
                scope,
                permissions: vec!["read".into()],
                ttl: 600,
            })
        }
    })
}

/// Stream endpoint that records the `token` query parameter
fn stream_route(seen_tokens: Arc<Mutex<Vec<String>>>, frames: String) -> axum::routing::MethodRouter {
    get(move |Query(params): Query<HashMap<String, String>>| {
        let seen_tokens = seen_tokens.clone();
        let frames = frames.clone();
        async move {
            if let Some(token) = params.get("token") {
                seen_tokens.lock().push(token.clone());
            }
            sse_response(&frames)
        }
    })
}

#[tokio::test]
async fn test_download_subscription_caches_and_broadcasts() {
    let download_id = uuid::Uuid::new_v4().to_string();
    let token_requests = Arc::new(Mutex::new(Vec::new()));
    let seen_tokens = Arc::new(Mutex::new(Vec::new()));

    let progress = json!({
        "download_id": download_id,
        "status": "downloading",
        "progress": {
            "percentage": 30.0,
            "downloaded_bytes": 300,
            "total_bytes": 1000,
            "speed": 10.0,
            "eta": 70.0
        }
    });
    let frames = format!("event: download_progress\ndata: {}\n\n", progress);

    let router = Router::new()
        .route("/api/v1/events/token", token_route(token_requests.clone()))
        .route(
            "/api/v1/events/downloads/{id}",
            stream_route(seen_tokens.clone(), frames),
        );
    let server = TestServer::start(router).await.unwrap();

    let cache = Arc::new(MemoryCache::new());
    let sub = server
        .client
        .subscribe_download(&download_id, cache.clone())
        .await
        .unwrap();
    let mut events = sub.events();

    let event = tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("no event")
        .unwrap();
    assert_eq!(event.download_id, download_id);
    assert_eq!(event.status, DownloadStatus::Downloading);
    assert_eq!(event.percentage(), Some(30.0));

    // Token minted with the channel scope and default TTL, then attached
    // to the stream URL
    {
        let requests = token_requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].scope, StreamScope::download(download_id.as_str()));
        assert_eq!(requests[0].ttl, 600);
    }
    assert_eq!(seen_tokens.lock().as_slice(), &["tok-abc".to_string()]);
    assert_eq!(sub.token().value, "tok-abc");

    // Full snapshot written through to the cache
    assert_eq!(
        cache.get(&CacheKey::DownloadProgress(download_id.clone())),
        Some(progress)
    );
}

#[tokio::test]
async fn test_queue_subscription_invalidates_cache() {
    let token_requests = Arc::new(Mutex::new(Vec::new()));
    let seen_tokens = Arc::new(Mutex::new(Vec::new()));

    let frames =
        "event: queue_update\ndata: {\"action\":\"removed\",\"download_id\":\"dl-1\"}\n\n"
            .to_string();
    let router = Router::new()
        .route("/api/v1/events/token", token_route(token_requests.clone()))
        .route("/api/v1/events/queue", stream_route(seen_tokens, frames));
    let server = TestServer::start(router).await.unwrap();

    let cache = Arc::new(MemoryCache::new());
    cache.set(CacheKey::Queue, json!([{"id": "dl-1"}]));
    cache.set(CacheKey::Stats, json!({"total": 5}));
    cache.set(CacheKey::Analytics, json!({"per_day": []}));
    cache.set(CacheKey::DownloadProgress("dl-1".into()), json!({"status": "queued"}));

    let sub = server.client.subscribe_queue(cache.clone()).await.unwrap();
    let mut events = sub.events();

    let event = tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("no event")
        .unwrap();
    assert_eq!(event.download_id.as_deref(), Some("dl-1"));

    let invalidated = wait_for(
        || async {
            cache.get(&CacheKey::Queue).is_none()
                && cache.get(&CacheKey::Stats).is_none()
                && cache
                    .get(&CacheKey::DownloadProgress("dl-1".into()))
                    .is_none()
        },
        WAIT,
    )
    .await;
    assert!(invalidated, "queue event did not invalidate cache entries");

    // Analytics is not a queue concern
    assert!(cache.get(&CacheKey::Analytics).is_some());
    assert_eq!(token_requests.lock()[0].scope, StreamScope::Queue);
}

#[tokio::test]
async fn test_stats_subscription_invalidates_rollups() {
    let token_requests = Arc::new(Mutex::new(Vec::new()));
    let seen_tokens = Arc::new(Mutex::new(Vec::new()));

    let frames = format!(
        "event: stats_update\ndata: {}\n\n",
        json!({
            "event": "download_completed",
            "download_id": "dl-9",
            "timestamp": Utc::now()
        })
    );
    let router = Router::new()
        .route("/api/v1/events/token", token_route(token_requests.clone()))
        .route("/api/v1/events/stats", stream_route(seen_tokens, frames));
    let server = TestServer::start(router).await.unwrap();

    let cache = Arc::new(MemoryCache::new());
    cache.set(CacheKey::Stats, json!({"total": 5}));
    cache.set(CacheKey::Analytics, json!({"per_day": []}));
    cache.set(CacheKey::Timeline, json!([]));
    cache.set(CacheKey::Queue, json!([]));

    let sub = server.client.subscribe_stats(cache.clone()).await.unwrap();
    let mut events = sub.events();

    let event = tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("no event")
        .unwrap();
    assert_eq!(event.trigger, StatsTrigger::DownloadCompleted);
    assert_eq!(event.download_id.as_deref(), Some("dl-9"));

    let invalidated = wait_for(
        || async {
            cache.get(&CacheKey::Stats).is_none()
                && cache.get(&CacheKey::Analytics).is_none()
                && cache.get(&CacheKey::Timeline).is_none()
        },
        WAIT,
    )
    .await;
    assert!(invalidated, "stats event did not invalidate rollups");

    // The queue listing stays cached
    assert!(cache.get(&CacheKey::Queue).is_some());
    assert_eq!(token_requests.lock()[0].scope, StreamScope::Stats);
}

struct FailingTokens;

#[async_trait::async_trait]
impl TokenProvider for FailingTokens {
    async fn request_token(
        &self,
        _scope: StreamScope,
        _ttl: u64,
    ) -> hermes_client::Result<ScopedToken> {
        Err(HermesClientError::server_error(500, "token backend down"))
    }
}

#[tokio::test]
async fn test_token_fetch_failure_opens_no_transport() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/api/v1/events/downloads/{id}",
        get({
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    sse_response("data: {\"x\":1}\n\n")
                }
            }
        }),
    );
    let server = TestServer::start(router).await.unwrap();
    let base_url = Url::parse(&server.base_url()).unwrap();

    let cache: Arc<dyn CacheConsumer> = Arc::new(MemoryCache::new());
    let result = hermes_client::DownloadSubscription::open(
        reqwest::Client::new(),
        &base_url,
        &FailingTokens,
        "dl-1",
        cache,
    )
    .await;

    match result {
        Err(StreamError::TokenFetch(message)) => {
            assert!(message.contains("token backend down"), "{message}");
        }
        Err(other) => panic!("expected TokenFetch error, got {other:?}"),
        Ok(_) => panic!("expected TokenFetch error, got a live subscription"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stream_health() {
    let router = Router::new().route(
        "/api/v1/events/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "active_connections": 3,
                "channels": {"queue": 1, "stats": 2}
            }))
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let health = server.client.stream_health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_connections, 3);
    assert_eq!(health.channels.get("queue"), Some(&1));
}

#[tokio::test]
async fn test_token_endpoint_unauthorized() {
    let router = Router::new().route(
        "/api/v1/events/token",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Not authenticated"})),
            )
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let request = CreateTokenRequest::new(StreamScope::Queue);
    let result = server.client.create_stream_token(&request).await;

    match result {
        Err(HermesClientError::Unauthorized(message)) => {
            assert_eq!(message, "Not authenticated");
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ttl_is_clamped_before_the_wire() {
    let token_requests = Arc::new(Mutex::new(Vec::new()));
    let seen_tokens = Arc::new(Mutex::new(Vec::new()));

    let router = Router::new()
        .route("/api/v1/events/token", token_route(token_requests.clone()))
        .route(
            "/api/v1/events/queue",
            stream_route(seen_tokens, "data: {\"ok\":true}\n\n".to_string()),
        );
    let server = TestServer::start(router).await.unwrap();

    // Out-of-range TTL goes over the wire clamped to the server's window
    let token = server
        .client
        .request_token(StreamScope::Queue, 86400)
        .await
        .unwrap();
    assert_eq!(token.ttl_seconds, 600);
    assert_eq!(token_requests.lock()[0].ttl, 3600);
}
