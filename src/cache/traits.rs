//! Result types shared by the cache and the fetch layer.

use std::time::Duration;

/// Result from a fetch, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// How old the cached entry was (cache hits only)
  pub age: Option<Duration>,
}

impl<T> CacheResult<T> {
  /// Create a new result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      age: None,
    }
  }

  /// Create a new result from a cached entry.
  pub fn from_cache(data: T, age: Duration) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      age: Some(age),
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }

  /// Convert the payload, keeping the source metadata.
  pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<CacheResult<U>, E> {
    Ok(CacheResult {
      data: f(self.data)?,
      source: self.source,
      age: self.age,
    })
  }
}

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its TTL
  Cache,
}
