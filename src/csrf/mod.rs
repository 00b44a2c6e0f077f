//! CSRF token handling for state-changing requests.
//!
//! The server sets an `XSRF-TOKEN` cookie; requests echo it back in an
//! `X-CSRF-Token` header. The last seen token is mirrored to a local store so
//! it can still be sent when the cookie is missing.

mod monitor;
mod source;
mod store;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use monitor::TokenMonitor;
pub use source::{find_cookie, CookieSource, JarCookies, StaticCookies};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

pub const DEFAULT_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const DEFAULT_HEADER_NAME: &str = "x-csrf-token";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Accept only non-empty, ASCII alphanumeric tokens.
pub fn validate_token(token: &str) -> bool {
  !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// In-memory copy of the stored token, loaded from the store at most once.
#[derive(Debug, Default)]
struct Mirror {
  loaded: bool,
  token: Option<String>,
}

/// Reads, persists and attaches CSRF tokens.
///
/// Clones share the same mirrored token.
#[derive(Clone)]
pub struct CsrfTokens {
  cookies: Arc<dyn CookieSource>,
  store: Arc<dyn TokenStore>,
  mirror: Arc<Mutex<Mirror>>,
  cookie_name: String,
  header_name: HeaderName,
  poll_interval: Duration,
}

impl CsrfTokens {
  pub fn new(cookies: Arc<dyn CookieSource>, store: Arc<dyn TokenStore>) -> Self {
    Self {
      cookies,
      store,
      mirror: Arc::new(Mutex::new(Mirror::default())),
      cookie_name: DEFAULT_COOKIE_NAME.to_string(),
      header_name: HeaderName::from_static(DEFAULT_HEADER_NAME),
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }

  pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
    self.cookie_name = name.into();
    self
  }

  pub fn with_header_name(mut self, name: HeaderName) -> Self {
    self.header_name = name;
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn header_name(&self) -> &HeaderName {
    &self.header_name
  }

  // Only plain data behind the lock, so poisoning is recoverable
  fn mirror(&self) -> MutexGuard<'_, Mirror> {
    let mut mirror = self.mirror.lock().unwrap_or_else(|p| p.into_inner());
    if !mirror.loaded {
      mirror.token = self.store.load();
      mirror.loaded = true;
    }
    mirror
  }

  /// Current token: the cookie if present (mirrored to the store), otherwise
  /// the last persisted value.
  ///
  /// The store is read once and written only when the cookie changes.
  pub fn get_token(&self) -> Option<String> {
    let cookie = self.cookies.cookie(&self.cookie_name);
    let mut mirror = self.mirror();
    match cookie {
      Some(token) => {
        if mirror.token.as_deref() != Some(token.as_str()) {
          if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "failed to persist CSRF token");
          }
          mirror.token = Some(token.clone());
        }
        Some(token)
      }
      None => {
        debug!(cookie = %self.cookie_name, "CSRF cookie missing, using stored token");
        mirror.token.clone()
      }
    }
  }

  /// Persist a token explicitly (e.g. one returned in a response body).
  pub fn store_token(&self, token: &str) -> io::Result<()> {
    let mut mirror = self.mirror();
    self.store.save(token)?;
    mirror.token = Some(token.to_string());
    Ok(())
  }

  pub fn clear_token(&self) -> io::Result<()> {
    let mut mirror = self.mirror();
    self.store.clear()?;
    mirror.token = None;
    Ok(())
  }

  /// Headers for a JSON API call: content type, the token header when a token
  /// is available, then `extra` (which overrides both).
  pub fn build_headers(&self, extra: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = self.get_token() {
      match HeaderValue::from_str(&token) {
        Ok(value) => {
          headers.insert(self.header_name.clone(), value);
        }
        Err(_) => warn!("CSRF token is not a valid header value, omitting"),
      }
    }

    for name in extra.keys() {
      headers.remove(name);
    }
    for (name, value) in extra {
      headers.append(name.clone(), value.clone());
    }

    headers
  }

  /// Poll the token on a fixed interval and call `callback` whenever it
  /// differs from the previous observation.
  ///
  /// The first observation is taken immediately, so `callback` only fires on
  /// a change after this call. Must be called within a tokio runtime.
  pub fn monitor<F>(&self, mut callback: F) -> TokenMonitor
  where
    F: FnMut(Option<String>) + Send + 'static,
  {
    let tokens = self.clone();
    let period = self.poll_interval;
    let mut last = self.get_token();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
      let mut interval = tokio::time::interval(period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // Skip the first tick (immediate)
      interval.tick().await;

      loop {
        tokio::select! {
          _ = interval.tick() => {
            let current = tokens.get_token();
            if current != last {
              info!(present = current.is_some(), "CSRF token changed");
              callback(current.clone());
              last = current;
            }
          }
          // Fires on explicit cancel and when the handle is dropped
          _ = &mut shutdown_rx => break,
        }
      }
    });

    TokenMonitor::new(shutdown_tx, handle)
  }
}
