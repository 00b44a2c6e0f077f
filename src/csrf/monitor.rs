use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Handle to a running token monitor.
///
/// Each monitor owns a single polling task. Calling `cancel` (or dropping the
/// handle) stops it; the callback is never invoked after the task exits.
pub struct TokenMonitor {
  shutdown: oneshot::Sender<()>,
  handle: JoinHandle<()>,
}

impl TokenMonitor {
  pub(super) fn new(shutdown: oneshot::Sender<()>, handle: JoinHandle<()>) -> Self {
    Self { shutdown, handle }
  }

  /// Whether the polling task is still running.
  pub fn is_active(&self) -> bool {
    !self.handle.is_finished()
  }

  /// Stop polling and wait for the task to exit.
  pub async fn cancel(self) {
    let _ = self.shutdown.send(());
    let _ = self.handle.await;
  }
}
