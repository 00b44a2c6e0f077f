//! Local fallback storage for the CSRF token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persists the last seen CSRF token so it survives a missing cookie.
pub trait TokenStore: Send + Sync {
  /// The stored token, if any.
  fn load(&self) -> Option<String>;

  fn save(&self, token: &str) -> io::Result<()>;

  fn clear(&self) -> io::Result<()>;
}

/// Token kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
  fn load(&self) -> Option<String> {
    self.token.lock().unwrap_or_else(|p| p.into_inner()).clone()
  }

  fn save(&self, token: &str) -> io::Result<()> {
    *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.to_string());
    Ok(())
  }

  fn clear(&self) -> io::Result<()> {
    *self.token.lock().unwrap_or_else(|p| p.into_inner()) = None;
    Ok(())
  }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
  token: String,
  saved_at: DateTime<Utc>,
}

/// Token stored as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
  path: PathBuf,
}

impl FileTokenStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `$XDG_DATA_HOME/storefront/csrf-token.json` (or the platform equivalent).
  ///
  /// Returns `None` if no data directory can be determined.
  pub fn default_path() -> Option<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?;
    Some(data_dir.join("storefront").join("csrf-token.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl TokenStore for FileTokenStore {
  fn load(&self) -> Option<String> {
    let content = fs::read_to_string(&self.path).ok()?;
    let stored: StoredToken = serde_json::from_str(&content).ok()?;
    Some(stored.token).filter(|t| !t.is_empty())
  }

  fn save(&self, token: &str) -> io::Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }

    let stored = StoredToken {
      token: token.to_string(),
      saved_at: Utc::now(),
    };
    let json = serde_json::to_string_pretty(&stored)
      .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(&self.path, json)
  }

  fn clear(&self) -> io::Result<()> {
    match fs::remove_file(&self.path) {
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      other => other,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_file_store_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileTokenStore::new(temp_dir.path().join("nested").join("token.json"));

    assert_eq!(store.load(), None);
    store.save("abc123").expect("Save should succeed");

    assert!(store.path().exists(), "Token file should exist");
    assert_eq!(store.load(), Some("abc123".to_string()));
  }

  #[test]
  fn test_file_store_clear() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileTokenStore::new(temp_dir.path().join("token.json"));

    store.save("abc123").unwrap();
    store.clear().unwrap();
    assert_eq!(store.load(), None);

    // Clearing an absent file is fine
    store.clear().unwrap();
  }

  #[test]
  fn test_file_store_ignores_corrupt_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("token.json");
    fs::write(&path, "not json").unwrap();

    assert_eq!(FileTokenStore::new(path).load(), None);
  }

  #[test]
  fn test_default_path_under_storefront_dir() {
    if let Some(path) = FileTokenStore::default_path() {
      assert!(path.ends_with("storefront/csrf-token.json"));
    }
  }

  #[test]
  fn test_memory_store() {
    let store = MemoryTokenStore::default();
    store.save("t1").unwrap();
    assert_eq!(store.load(), Some("t1".to_string()));
    store.clear().unwrap();
    assert_eq!(store.load(), None);
  }
}
