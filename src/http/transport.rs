//! HTTP transport abstraction.
//!
//! `Transport` abstracts the network call so the retry and cache logic can be
//! tested without a server. `ReqwestTransport` is the real implementation;
//! `MockTransport` replays scripted responses in tests.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use tracing::trace;

use super::error::FetchError;
use super::request::FetchRequest;

/// Raw response as seen by the fetch layer, before validation.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Whether the declared content type is JSON (`application/json`, any params).
  pub fn is_json(&self) -> bool {
    self
      .content_type
      .as_deref()
      .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
      .unwrap_or(false)
  }
}

/// Performs a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: &FetchRequest) -> Result<RawResponse, FetchError>;
}

/// Transport backed by `reqwest`, always sending cookies from a shared jar.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: Client,
  jar: Arc<Jar>,
}

impl ReqwestTransport {
  pub fn new(user_agent: &str) -> Result<Self, FetchError> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
      .cookie_provider(Arc::clone(&jar))
      .user_agent(user_agent)
      .build()?;

    Ok(Self { client, jar })
  }

  /// The cookie jar used for every request (credentials are always included).
  pub fn cookie_jar(&self) -> Arc<Jar> {
    Arc::clone(&self.jar)
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
    trace!(method = %request.method, url = %request.url, "sending request");

    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone())
      .headers(request.headers.clone());
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.bytes().await?.to_vec();

    Ok(RawResponse {
      status,
      content_type,
      body,
    })
  }
}

#[cfg(test)]
pub use mock::MockTransport;

#[cfg(test)]
mod mock {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::Mutex;
  use tokio::time::Instant;

  type Scripted = Result<RawResponse, FetchError>;

  /// Replays queued responses in order and records every request it sees.
  ///
  /// Once the queue is empty the fallback response (if any) is repeated.
  #[derive(Default)]
  pub struct MockTransport {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<RawResponse>>,
    calls: Mutex<Vec<(FetchRequest, Instant)>>,
  }

  impl MockTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn json(status: u16, body: serde_json::Value) -> RawResponse {
      RawResponse {
        status,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: serde_json::to_vec(&body).unwrap(),
      }
    }

    pub fn html(status: u16) -> RawResponse {
      RawResponse {
        status,
        content_type: Some("text/html".to_string()),
        body: b"<html></html>".to_vec(),
      }
    }

    pub fn push(self, response: RawResponse) -> Self {
      self.queue.lock().unwrap().push_back(Ok(response));
      self
    }

    pub fn push_network_error(self, message: &str) -> Self {
      self
        .queue
        .lock()
        .unwrap()
        .push_back(Err(FetchError::Network(message.to_string().into())));
      self
    }

    pub fn always(self, response: RawResponse) -> Self {
      *self.fallback.lock().unwrap() = Some(response);
      self
    }

    pub fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(r, _)| r.clone())
        .collect()
    }

    /// Virtual-clock instants at which each request was sent.
    pub fn call_times(&self) -> Vec<Instant> {
      self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
  }

  #[async_trait]
  impl Transport for MockTransport {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
      self
        .calls
        .lock()
        .unwrap()
        .push((request.clone(), Instant::now()));

      if let Some(next) = self.queue.lock().unwrap().pop_front() {
        return next;
      }
      match self.fallback.lock().unwrap().clone() {
        Some(response) => Ok(response),
        None => Err(FetchError::Network("no scripted response".into())),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(content_type: Option<&str>, status: u16) -> RawResponse {
    RawResponse {
      status,
      content_type: content_type.map(String::from),
      body: Vec::new(),
    }
  }

  #[test]
  fn test_is_json_accepts_charset_param() {
    assert!(response(Some("application/json; charset=utf-8"), 200).is_json());
    assert!(response(Some("Application/JSON"), 200).is_json());
  }

  #[test]
  fn test_is_json_rejects_other_types() {
    assert!(!response(Some("text/html"), 200).is_json());
    assert!(!response(None, 200).is_json());
  }

  #[test]
  fn test_success_range() {
    assert!(response(None, 200).is_success());
    assert!(response(None, 204).is_success());
    assert!(!response(None, 199).is_success());
    assert!(!response(None, 300).is_success());
    assert!(!response(None, 404).is_success());
  }
}
