use thiserror::Error;

/// Errors produced while fetching from the storefront API.
///
/// Every variant is retried the same way by the fetch layer; once retries are
/// exhausted the last error is returned as-is.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The server answered with a status outside 200-299
  #[error("request to {url} failed with status {status}")]
  Http { status: u16, url: String },

  /// The response did not declare a JSON content type
  #[error("expected JSON from {url}, got content type {}", .content_type.as_deref().unwrap_or("<none>"))]
  NonJsonResponse {
    content_type: Option<String>,
    url: String,
  },

  /// Connection refused, DNS failure, TLS error and the like
  #[error("network request failed: {0}")]
  Network(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The body claimed to be JSON but did not parse
  #[error("failed to decode JSON response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid URL: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    FetchError::Network(Box::new(err))
  }
}

impl FetchError {
  /// HTTP status code, if the failure came from a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Short message suitable for showing to a shopper.
  pub fn user_message(&self) -> &'static str {
    match self {
      FetchError::Http { status, .. } => match status {
        401 => "Please sign in to continue.",
        403 => "You don't have permission to do that.",
        404 => "We couldn't find what you were looking for.",
        // Laravel-style CSRF mismatch
        419 => "Your session has expired. Please refresh and try again.",
        429 => "Too many requests. Please wait a moment and try again.",
        500..=599 => "The store is having trouble right now. Please try again later.",
        _ => "Something went wrong with your request.",
      },
      FetchError::Network(_) => "Unable to reach the store. Check your connection.",
      FetchError::NonJsonResponse { .. } | FetchError::Decode(_) => {
        "The store sent an unexpected response."
      }
      FetchError::InvalidUrl(_) => "Something went wrong with your request.",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn http(status: u16) -> FetchError {
    FetchError::Http {
      status,
      url: "https://shop.test/api/products".to_string(),
    }
  }

  #[test]
  fn test_user_message_by_status() {
    assert_eq!(
      http(404).user_message(),
      "We couldn't find what you were looking for."
    );
    assert_eq!(
      http(503).user_message(),
      "The store is having trouble right now. Please try again later."
    );
    assert_eq!(http(418).user_message(), "Something went wrong with your request.");
  }

  #[test]
  fn test_network_message() {
    let err = FetchError::Network("connection refused".into());
    assert_eq!(
      err.user_message(),
      "Unable to reach the store. Check your connection."
    );
    assert_eq!(err.to_string(), "network request failed: connection refused");
  }

  #[test]
  fn test_non_json_display() {
    let err = FetchError::NonJsonResponse {
      content_type: Some("text/html".to_string()),
      url: "https://shop.test/".to_string(),
    };
    assert_eq!(
      err.to_string(),
      "expected JSON from https://shop.test/, got content type text/html"
    );
    assert_eq!(err.status(), None);
    assert_eq!(http(500).status(), Some(500));
  }
}
