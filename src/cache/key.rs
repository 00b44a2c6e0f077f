//! Cache key derivation for HTTP requests.

use reqwest::Method;
use sha2::{Digest, Sha256};

/// Build the cache key for a request.
///
/// Bodyless requests are keyed as `"<METHOD> <url>"`. Requests with a body get
/// a SHA-256 digest of the body appended, so two POSTs to the same URL with
/// different payloads never share an entry. The URL is always kept verbatim
/// so substring invalidation by path still matches.
pub fn request_key(method: &Method, url: &str, body: Option<&[u8]>) -> String {
  match body {
    Some(body) if !body.is_empty() => {
      let mut hasher = Sha256::new();
      hasher.update(body);
      format!("{} {} #{}", method, url, hex::encode(hasher.finalize()))
    }
    _ => format!("{} {}", method, url),
  }
}
