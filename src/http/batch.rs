//! Bounded-concurrency execution of pending requests.

use futures::future::try_join_all;
use std::future::Future;
use tracing::debug;

/// Default number of operations run concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Runs futures in fixed-size groups.
///
/// All futures in a group run concurrently; the next group does not start
/// until the current one has completed. Results come back in input order.
/// The first error aborts everything still pending: its siblings in the same
/// group are dropped and later groups never start.
#[derive(Debug, Clone, Copy)]
pub struct RequestBatcher {
  batch_size: usize,
}

impl Default for RequestBatcher {
  fn default() -> Self {
    Self::new(DEFAULT_BATCH_SIZE)
  }
}

impl RequestBatcher {
  /// Create a batcher. A batch size of zero is treated as one.
  pub fn new(batch_size: usize) -> Self {
    Self {
      batch_size: batch_size.max(1),
    }
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  pub async fn run<I, Fut, T, E>(&self, operations: I) -> Result<Vec<T>, E>
  where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut pending = operations.into_iter().peekable();
    let mut results = Vec::new();
    let mut batch_index = 0usize;

    while pending.peek().is_some() {
      let batch: Vec<Fut> = pending.by_ref().take(self.batch_size).collect();
      debug!(batch = batch_index, size = batch.len(), "running request batch");

      let outputs = try_join_all(batch).await?;
      results.extend(outputs);
      batch_index += 1;
    }

    Ok(results)
  }
}
