//! Fetch client that combines the response cache, retry with linear backoff,
//! JSON validation and CSRF headers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheResult, CacheStore};
use crate::csrf::CsrfTokens;

use super::batch::RequestBatcher;
use super::error::FetchError;
use super::request::FetchRequest;
use super::transport::{RawResponse, Transport};

/// How failed requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first attempt (so `max_retries + 1` attempts total)
  pub max_retries: u32,
  /// Delay before the first retry; retry `n` waits `base_delay * n`
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      base_delay: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  /// Single attempt, for requests that must not be repeated.
  pub const NONE: RetryPolicy = RetryPolicy {
    max_retries: 0,
    base_delay: Duration::ZERO,
  };

  /// Delay before retry number `retry + 1` (zero-based): 1s, 2s, 3s by default.
  pub fn delay_for(&self, retry: u32) -> Duration {
    self.base_delay * (retry + 1)
  }
}

/// Storefront API client with transparent response caching.
///
/// The cache is shared, not owned: the composition root creates one
/// `CacheStore` and hands it to every client that should see the same entries.
pub struct FetchClient<T: Transport> {
  transport: Arc<T>,
  cache: Arc<CacheStore>,
  retry: RetryPolicy,
  batcher: RequestBatcher,
  csrf: Option<CsrfTokens>,
}

impl<T: Transport> Clone for FetchClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      cache: Arc::clone(&self.cache),
      retry: self.retry,
      batcher: self.batcher,
      csrf: self.csrf.clone(),
    }
  }
}

impl<T: Transport> FetchClient<T> {
  pub fn new(transport: T, cache: Arc<CacheStore>) -> Self {
    Self {
      transport: Arc::new(transport),
      cache,
      retry: RetryPolicy::default(),
      batcher: RequestBatcher::default(),
      csrf: None,
    }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_batcher(mut self, batcher: RequestBatcher) -> Self {
    self.batcher = batcher;
    self
  }

  /// Attach CSRF handling: every outgoing request gets the JSON content type
  /// and the token header, unless the request already sets them.
  pub fn with_csrf(mut self, csrf: CsrfTokens) -> Self {
    self.csrf = Some(csrf);
    self
  }

  pub fn cache(&self) -> &Arc<CacheStore> {
    &self.cache
  }

  pub fn csrf(&self) -> Option<&CsrfTokens> {
    self.csrf.as_ref()
  }

  /// Fetch JSON with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately without any network I/O
  /// 2. On miss, fetch from network, retrying failures with linear backoff
  /// 3. Store the parsed response in the cache
  pub async fn fetch(&self, request: &FetchRequest) -> Result<CacheResult<Value>, FetchError> {
    let key = request.cache_key();

    if let Some((value, age)) = self.cache.get_with_age(&key) {
      debug!(%key, age_ms = age.as_millis() as u64, "cache hit");
      return Ok(CacheResult::from_cache(value, age));
    }

    debug!(%key, "cache miss");
    let value = self.send(request).await?;
    self.cache.set(key, value.clone());

    Ok(CacheResult::from_network(value))
  }

  /// `fetch` followed by typed deserialization.
  pub async fn fetch_json<D: DeserializeOwned>(
    &self,
    request: &FetchRequest,
  ) -> Result<CacheResult<D>, FetchError> {
    let result = self.fetch(request).await?;
    Ok(result.try_map(serde_json::from_value)?)
  }

  /// Fetch many requests through the batcher. Results are in input order.
  pub async fn fetch_all(&self, requests: &[FetchRequest]) -> Result<Vec<Value>, FetchError> {
    let results = self
      .batcher
      .run(requests.iter().map(|request| self.fetch(request)))
      .await?;

    Ok(results.into_iter().map(|r| r.data).collect())
  }

  /// Perform a request with retry and JSON validation, bypassing the cache.
  ///
  /// Used for state-changing calls whose responses must not be served again.
  pub async fn send(&self, request: &FetchRequest) -> Result<Value, FetchError> {
    self.send_with(request, self.retry).await
  }

  /// `send` with an explicit retry policy. Non-idempotent writes pass
  /// `RetryPolicy::NONE` so a server error after commit is not repeated.
  pub async fn send_with(
    &self,
    request: &FetchRequest,
    retry_policy: RetryPolicy,
  ) -> Result<Value, FetchError> {
    let request = self.prepare(request);
    let mut retry = 0;

    loop {
      match self.attempt(&request).await {
        Ok(value) => return Ok(value),
        Err(err) if retry < retry_policy.max_retries => {
          let delay = retry_policy.delay_for(retry);
          warn!(
            url = %request.url,
            attempt = retry + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "request failed, retrying"
          );
          tokio::time::sleep(delay).await;
          retry += 1;
        }
        Err(err) => {
          warn!(url = %request.url, attempts = retry + 1, error = %err, "request failed");
          return Err(err);
        }
      }
    }
  }

  /// Remove cached responses whose key contains `pattern`.
  pub fn invalidate(&self, pattern: &str) -> usize {
    self.cache.invalidate(pattern)
  }

  fn prepare(&self, request: &FetchRequest) -> FetchRequest {
    let mut request = request.clone();
    if let Some(csrf) = &self.csrf {
      request.headers = csrf.build_headers(&request.headers);
    }
    request
  }

  async fn attempt(&self, request: &FetchRequest) -> Result<Value, FetchError> {
    let response = self.transport.send(request).await?;
    validate(request, &response)?;
    Ok(serde_json::from_slice(&response.body)?)
  }
}

fn validate(request: &FetchRequest, response: &RawResponse) -> Result<(), FetchError> {
  if !response.is_success() {
    return Err(FetchError::Http {
      status: response.status,
      url: request.url.to_string(),
    });
  }

  if !response.is_json() {
    return Err(FetchError::NonJsonResponse {
      content_type: response.content_type.clone(),
      url: request.url.to_string(),
    });
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::csrf::{MemoryTokenStore, StaticCookies};
  use crate::http::transport::MockTransport;
  use reqwest::header::CONTENT_TYPE;
  use serde_json::json;
  use tokio::time::Instant;

  fn client(transport: MockTransport) -> FetchClient<MockTransport> {
    FetchClient::new(transport, Arc::new(CacheStore::new()))
  }

  fn products_request() -> FetchRequest {
    FetchRequest::get_str("https://shop.test/api/products").unwrap()
  }

  fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
  }

  #[tokio::test]
  async fn test_miss_then_hit() {
    let client = client(MockTransport::new().push(MockTransport::json(200, json!([1, 2, 3]))));

    let first = client.fetch(&products_request()).await.unwrap();
    let second = client.fetch(&products_request()).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!([1, 2, 3]));
    assert_eq!(client.transport.call_count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_entry_is_refetched() {
    let client = client(
      MockTransport::new()
        .push(MockTransport::json(200, json!({"v": 1})))
        .push(MockTransport::json(200, json!({"v": 2}))),
    );

    client.fetch(&products_request()).await.unwrap();
    tokio::time::advance(Duration::from_secs(301)).await;
    let refreshed = client.fetch(&products_request()).await.unwrap();

    assert_eq!(refreshed.data, json!({"v": 2}));
    assert_eq!(client.transport.call_count(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_two_failures_then_success() {
    let client = client(
      MockTransport::new()
        .push(MockTransport::json(500, json!({"error": "boom"})))
        .push_network_error("connection reset")
        .push(MockTransport::json(200, json!({"ok": true}))),
    );

    let result = client.fetch(&products_request()).await.unwrap();

    assert_eq!(result.data, json!({"ok": true}));
    assert_eq!(client.transport.call_count(), 3);
    assert_eq!(
      gaps(&client.transport.call_times()),
      vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_four_failures_propagate_last_error() {
    let client = client(
      MockTransport::new()
        .push(MockTransport::json(500, json!({})))
        .push(MockTransport::json(502, json!({})))
        .push(MockTransport::json(503, json!({})))
        .push(MockTransport::json(504, json!({})))
        .push(MockTransport::json(200, json!("never reached"))),
    );

    let err = client.fetch(&products_request()).await.unwrap_err();

    assert_eq!(err.status(), Some(504));
    assert_eq!(client.transport.call_count(), 4);
    assert_eq!(
      gaps(&client.transport.call_times()),
      vec![
        Duration::from_millis(1000),
        Duration::from_millis(2000),
        Duration::from_millis(3000)
      ]
    );
    assert!(client.cache().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_non_json_response_is_retried_then_reported() {
    let client = client(MockTransport::new().always(MockTransport::html(200)));

    let err = client.fetch(&products_request()).await.unwrap_err();

    assert!(matches!(
      err,
      FetchError::NonJsonResponse { content_type: Some(ref ct), .. } if ct == "text/html"
    ));
    assert_eq!(client.transport.call_count(), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_custom_retry_policy() {
    let client = client(MockTransport::new().push_network_error("refused")).with_retry(
      RetryPolicy {
        max_retries: 0,
        base_delay: Duration::from_millis(10),
      },
    );

    let err = client.fetch(&products_request()).await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
    assert_eq!(client.transport.call_count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_send_with_no_retry_makes_single_attempt() {
    let client = client(
      MockTransport::new()
        .push(MockTransport::json(500, json!({})))
        .push(MockTransport::json(201, json!({"id": 1}))),
    );
    let request = FetchRequest::post(url::Url::parse("https://shop.test/api/reviews").unwrap());

    let err = client.send_with(&request, RetryPolicy::NONE).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(client.transport.call_count(), 1);
  }

  #[test]
  fn test_delay_is_linear() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(2), Duration::from_secs(3));
  }

  #[tokio::test]
  async fn test_send_bypasses_cache() {
    let client = client(MockTransport::new().always(MockTransport::json(201, json!({"id": 9}))));
    let request = FetchRequest::post(url::Url::parse("https://shop.test/api/reviews").unwrap());

    client.send(&request).await.unwrap();
    client.send(&request).await.unwrap();

    assert_eq!(client.transport.call_count(), 2);
    assert!(client.cache().is_empty());
  }

  #[tokio::test]
  async fn test_fetch_all_preserves_order() {
    let client = client(
      MockTransport::new()
        .push(MockTransport::json(200, json!("a")))
        .push(MockTransport::json(200, json!("b")))
        .push(MockTransport::json(200, json!("c"))),
    );
    let requests: Vec<FetchRequest> = ["x", "y", "z"]
      .iter()
      .map(|p| FetchRequest::get_str(&format!("https://shop.test/api/{}", p)).unwrap())
      .collect();

    let values = client.fetch_all(&requests).await.unwrap();

    assert_eq!(values, vec![json!("a"), json!("b"), json!("c")]);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let client = client(MockTransport::new().always(MockTransport::json(200, json!({}))));

    client.fetch(&products_request()).await.unwrap();
    assert_eq!(client.invalidate("/api/products"), 1);
    client.fetch(&products_request()).await.unwrap();

    assert_eq!(client.transport.call_count(), 2);
  }

  #[tokio::test]
  async fn test_csrf_headers_added() {
    let csrf = CsrfTokens::new(
      Arc::new(StaticCookies::with("XSRF-TOKEN", "abc123")),
      Arc::new(MemoryTokenStore::default()),
    );
    let client = client(MockTransport::new().always(MockTransport::json(200, json!({}))))
      .with_csrf(csrf);

    client.send(&products_request()).await.unwrap();

    let sent = &client.transport.requests()[0];
    assert_eq!(sent.headers.get("x-csrf-token").unwrap(), "abc123");
    assert_eq!(sent.headers.get(CONTENT_TYPE).unwrap(), "application/json");
  }

  #[tokio::test]
  async fn test_fetch_json_typed() {
    #[derive(serde::Deserialize)]
    struct Count {
      total: u32,
    }

    let client = client(MockTransport::new().push(MockTransport::json(200, json!({"total": 12}))));

    let result = client
      .fetch_json::<Count>(&products_request())
      .await
      .unwrap();

    assert_eq!(result.data.total, 12);
  }
}
