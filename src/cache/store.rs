//! In-memory response store with a fixed time-to-live.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached JSON response and the moment it was stored.
#[derive(Debug, Clone)]
struct CacheEntry {
  value: Value,
  stored_at: Instant,
}

/// Key → response mapping with TTL-based freshness.
///
/// Expired entries are never returned but are not removed by `get`; they stay
/// until overwritten, invalidated, or reclaimed with `purge_expired`.
#[derive(Debug)]
pub struct CacheStore {
  entries: Mutex<HashMap<String, CacheEntry>>,
  ttl: Duration,
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new()
  }
}

impl CacheStore {
  /// Create an empty store with the default five minute TTL.
  pub fn new() -> Self {
    Self::with_ttl(DEFAULT_TTL)
  }

  /// Create an empty store with a custom TTL.
  pub fn with_ttl(ttl: Duration) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  // Entries are plain data, so a panic while holding the lock can't leave
  // the map half-written. Recover the guard instead of propagating poison.
  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self
      .entries
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Return the stored value if it is younger than the TTL.
  pub fn get(&self, key: &str) -> Option<Value> {
    self.get_with_age(key).map(|(value, _)| value)
  }

  /// Like `get`, but also report how old the entry is.
  pub fn get_with_age(&self, key: &str) -> Option<(Value, Duration)> {
    let entries = self.lock();
    let entry = entries.get(key)?;
    let age = entry.stored_at.elapsed();
    if age < self.ttl {
      Some((entry.value.clone(), age))
    } else {
      debug!(key, age_ms = age.as_millis() as u64, "cache entry expired");
      None
    }
  }

  /// Store a value, replacing any previous entry and resetting its timestamp.
  pub fn set(&self, key: impl Into<String>, value: Value) {
    let entry = CacheEntry {
      value,
      stored_at: Instant::now(),
    };
    self.lock().insert(key.into(), entry);
  }

  /// Remove a single entry by exact key.
  pub fn remove(&self, key: &str) -> bool {
    self.lock().remove(key).is_some()
  }

  /// Remove every key containing `pattern` as a literal substring.
  ///
  /// Returns the number of entries removed.
  pub fn invalidate(&self, pattern: &str) -> usize {
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|key, _| !key.contains(pattern));
    let removed = before - entries.len();
    debug!(pattern, removed, "invalidated cache entries");
    removed
  }

  /// Drop entries whose TTL has elapsed. Returns the number removed.
  pub fn purge_expired(&self) -> usize {
    let ttl = self.ttl;
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
    before - entries.len()
  }

  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Number of stored entries, including expired ones not yet purged.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }
}
