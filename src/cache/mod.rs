//! In-memory response caching.
//!
//! This module provides the response store used by the fetch layer:
//! - A key → JSON mapping with a fixed time-to-live (five minutes by default)
//! - Substring-based invalidation for evicting related entries after writes
//! - Request key derivation (method + URL + body digest)

mod key;
mod store;
mod traits;

pub use key::request_key;
pub use store::{CacheStore, DEFAULT_TTL};
pub use traits::{CacheResult, CacheSource};
