use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::cache::request_key;

use super::error::FetchError;

/// Description of a single HTTP request.
///
/// Retries reuse the same request unchanged, so it is cloned rather than
/// consumed by the transport.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub method: Method,
  pub url: Url,
  pub headers: HeaderMap,
  pub body: Option<Vec<u8>>,
}

impl FetchRequest {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      headers: HeaderMap::new(),
      body: None,
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  /// Parse `url` and build a GET request.
  pub fn get_str(url: &str) -> Result<Self, FetchError> {
    Ok(Self::get(Url::parse(url)?))
  }

  pub fn post(url: Url) -> Self {
    Self::new(Method::POST, url)
  }

  pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  /// Serialize `body` as the JSON request payload.
  pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, FetchError> {
    self.body = Some(serde_json::to_vec(body)?);
    Ok(self)
  }

  /// Key under which this request's response is cached.
  pub fn cache_key(&self) -> String {
    request_key(&self.method, self.url.as_str(), self.body.as_deref())
  }
}
