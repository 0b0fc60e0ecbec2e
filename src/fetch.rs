use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use thiserror::Error;
use tokio::time::sleep;

use crate::clock::Clock;
use crate::limiter::{QuotaExceeded, RateLimiter};

/// Freshness window for the URL-level response cache.
pub const URL_CACHE_TTL_MS: i64 = 300_000;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("rate limited by provider, retry after: {0}s")]
    RateLimited(u64),
    #[error("API error: {0}")]
    ApiError(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Quota(#[from] QuotaExceeded),
    #[error("network error: {0}")]
    Network(#[from] TransportError),
}

/// Raw JSON-over-HTTP GET, substitutable in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("AirWatch/1.0")
            .timeout(StdDuration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let mut retry_count = 0;
        let max_retries = 3;
        let mut delay = StdDuration::from_millis(1000);

        loop {
            let response = self.client.get(url).send().await?;

            match response.status() {
                reqwest::StatusCode::OK => {
                    let json: Value = response.json().await?;
                    return Ok(json);
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if retry_count >= max_retries {
                        return Err(TransportError::RateLimited(delay.as_secs()));
                    }

                    tracing::warn!(
                        "provider throttled the request, retrying in {}ms",
                        delay.as_millis()
                    );

                    sleep(delay).await;
                    delay = delay.mul_f32(2.0 + fastrand::f32() * 0.5); // Exponential backoff with jitter
                    retry_count += 1;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(TransportError::ApiError(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: DateTime<Utc>,
}

/// Short-TTL cache of raw responses keyed by the exact request URL, so
/// distinct coordinate or time-range queries never collide.
pub struct UrlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl UrlCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::milliseconds(URL_CACHE_TTL_MS),
            clock,
        }
    }

    fn cache_key(url: &str) -> String {
        format!("api_cache:{}", urlencoding::encode(url))
    }

    pub fn get(&self, url: &str) -> Option<Value> {
        let key = Self::cache_key(url);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();

        match entries.get(&key) {
            Some(entry) if now - entry.stored_at < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                // Stale, evict lazily.
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, url: &str, value: Value) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries
            .lock()
            .unwrap()
            .insert(Self::cache_key(url), entry);
    }
}

/// Gated fetch: URL cache in front, rate limiter behind it, so a cache hit
/// never spends quota.
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    cache: UrlCache,
    limiter: Arc<RateLimiter>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            cache: UrlCache::new(clock),
            limiter,
        }
    }

    pub async fn fetch_through(&self, url: &str) -> Result<Value, FetchError> {
        if let Some(cached) = self.cache.get(url) {
            tracing::debug!("url cache hit");
            return Ok(cached);
        }

        self.limiter.reserve().await?;

        let value = self.transport.get_json(url).await?;
        self.cache.put(url, value.clone());

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::limiter::MemoryBudgetStore;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubTransport {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get_json(&self, _url: &str) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TransportError::ApiError("HTTP 500: boom".to_string()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        ))
    }

    fn client_with(
        transport: Arc<StubTransport>,
        limit: u32,
        clock: Arc<ManualClock>,
    ) -> FetchClient {
        let limiter = Arc::new(RateLimiter::with_limit(
            Arc::new(MemoryBudgetStore::new()),
            clock.clone(),
            limit,
        ));
        FetchClient::new(transport, limiter, clock)
    }

    #[test]
    fn get_after_put_returns_stored_value() {
        let cache = UrlCache::new(manual_clock());
        cache.put("https://example.com/a?x=1", json!({"v": 1}));

        assert_eq!(cache.get("https://example.com/a?x=1"), Some(json!({"v": 1})));
        assert_eq!(cache.get("https://example.com/a?x=2"), None);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let clock = manual_clock();
        let cache = UrlCache::new(clock.clone());
        cache.put("https://example.com/a", json!(1));

        clock.advance(Duration::milliseconds(URL_CACHE_TTL_MS - 1));
        assert!(cache.get("https://example.com/a").is_some());

        clock.advance(Duration::milliseconds(2));
        assert!(cache.get("https://example.com/a").is_none());
    }

    #[tokio::test]
    async fn cache_hit_skips_limiter_and_transport() {
        let transport = Arc::new(StubTransport::new(false));
        let clock = manual_clock();
        // Zero budget: any reservation attempt would fail.
        let client = client_with(transport.clone(), 0, clock);
        client.cache.put("https://example.com/a", json!(42));

        let value = client.fetch_through("https://example.com/a").await.unwrap();
        assert_eq!(value, json!(42));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_fetches_once_then_serves_from_cache() {
        let transport = Arc::new(StubTransport::new(false));
        let client = client_with(transport.clone(), 10, manual_clock());

        client.fetch_through("https://example.com/a").await.unwrap();
        client.fetch_through("https://example.com/a").await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quota_denial_propagates_without_network_call() {
        let transport = Arc::new(StubTransport::new(false));
        let client = client_with(transport.clone(), 0, manual_clock());

        let err = client.fetch_through("https://example.com/a").await;
        assert!(matches!(err, Err(FetchError::Quota(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_response_is_not_cached() {
        let transport = Arc::new(StubTransport::new(true));
        let client = client_with(transport.clone(), 10, manual_clock());

        assert!(client.fetch_through("https://example.com/a").await.is_err());
        assert!(client.fetch_through("https://example.com/a").await.is_err());

        // Both attempts went to the network.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
