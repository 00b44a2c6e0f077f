//! Where CSRF tokens are read from.

use reqwest::cookie::{CookieStore, Jar};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Read access to cookies visible to the storefront API.
pub trait CookieSource: Send + Sync {
  fn cookie(&self, name: &str) -> Option<String>;
}

/// Cookies held in the HTTP client's jar for the API origin.
pub struct JarCookies {
  jar: Arc<Jar>,
  url: Url,
}

impl JarCookies {
  pub fn new(jar: Arc<Jar>, url: Url) -> Self {
    Self { jar, url }
  }
}

impl CookieSource for JarCookies {
  fn cookie(&self, name: &str) -> Option<String> {
    let header = self.jar.cookies(&self.url)?;
    let header = header.to_str().ok()?;
    find_cookie(header, name)
  }
}

/// Fixed, mutable set of cookies. Useful for tooling and tests.
#[derive(Debug, Default)]
pub struct StaticCookies {
  cookies: Mutex<HashMap<String, String>>,
}

impl StaticCookies {
  pub fn with(name: &str, value: &str) -> Self {
    let cookies = Self::default();
    cookies.set(name, value);
    cookies
  }

  pub fn set(&self, name: &str, value: &str) {
    self
      .cookies
      .lock()
      .unwrap_or_else(|p| p.into_inner())
      .insert(name.to_string(), value.to_string());
  }

  pub fn remove(&self, name: &str) {
    self
      .cookies
      .lock()
      .unwrap_or_else(|p| p.into_inner())
      .remove(name);
  }
}

impl CookieSource for StaticCookies {
  fn cookie(&self, name: &str) -> Option<String> {
    self
      .cookies
      .lock()
      .unwrap_or_else(|p| p.into_inner())
      .get(name)
      .filter(|v| !v.is_empty())
      .cloned()
  }
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`).
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
  header
    .split(';')
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(key, _)| *key == name)
    .map(|(_, value)| value.trim().trim_matches('"').to_string())
    .filter(|value| !value.is_empty())
}
