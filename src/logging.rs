use color_eyre::{eyre::eyre, Result};
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// Console output goes to stderr so command output on stdout stays clean.
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured the returned guard must be kept alive to flush it.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = match std::env::var("RUST_LOG") {
    Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
    _ => EnvFilter::new(format!(
      "warn,storefront={}",
      config.level.trim().to_lowercase()
    )),
  };

  let console_layer = fmt::layer().compact().with_target(false).with_writer(io::stderr);
  let registry = tracing_subscriber::registry().with(filter).with(console_layer);

  match &config.file {
    Some(file) => {
      let directory = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let prefix = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!("Invalid log file path: {}", file.display()))?;

      let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(directory)
        .map_err(|e| eyre!("Failed to create log file appender: {}", e))?;
      let (writer, guard) = tracing_appender::non_blocking(appender);

      let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
      registry
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      registry
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;
      Ok(None)
    }
  }
}
