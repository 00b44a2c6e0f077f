//! HTTP access to the storefront API.
//!
//! `FetchClient` is the entry point: a cache-first fetch with linear
//! retry/backoff and JSON validation over a pluggable `Transport`.

mod batch;
mod client;
mod error;
mod request;
mod transport;

pub use batch::{RequestBatcher, DEFAULT_BATCH_SIZE};
pub use client::{FetchClient, RetryPolicy};
pub use error::FetchError;
pub use request::FetchRequest;
pub use transport::{RawResponse, ReqwestTransport, Transport};

#[cfg(test)]
pub use transport::MockTransport;
