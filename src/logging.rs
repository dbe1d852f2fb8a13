//! Logging setup.
//!
//! Console output always goes to stderr. With `LogConfig::file` set, a
//! daily-rolling file is also written under `~/.image-feed-uploader/logs`,
//! as plain text or JSON lines.

use crate::config_utils::{get_logs_dir, LogConfig};
use crate::errors::{ClientError, ClientResult};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "uploader.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process.
pub fn init_logging(config: &LogConfig) -> ClientResult<Option<WorkerGuard>> {
    if config.file {
        let logs_dir = get_logs_dir()?;
        init_logging_in(config, Some(&logs_dir))
    } else {
        init_logging_in(config, None)
    }
}

/// Same as [`init_logging`] with an explicit log directory
pub fn init_logging_in(config: &LogConfig, logs_dir: Option<&Path>) -> ClientResult<Option<WorkerGuard>> {
    let filter = build_filter(config);

    let (file_writer, guard) = match logs_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let plain_file = file_writer
        .clone()
        .filter(|_| !config.json)
        .map(|writer| fmt::layer().with_ansi(false).with_writer(writer));
    let json_file = file_writer
        .filter(|_| config.json)
        .map(|writer| fmt::layer().json().with_writer(writer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(plain_file)
        .with(json_file)
        .try_init()
        .map_err(|e| ClientError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

/// RUST_LOG wins; otherwise the configured level
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_filter_falls_back_on_garbage_level() {
        let config = LogConfig {
            level: "[[not a directive".to_string(),
            ..LogConfig::default()
        };
        // Must not panic
        let _ = build_filter(&config);
    }

    #[test]
    fn test_init_logging_creates_log_dir_once() {
        let temp_dir = TempDir::new().unwrap();
        let logs_dir = temp_dir.path().join("logs");
        let config = LogConfig {
            file: true,
            ..LogConfig::default()
        };

        let first = init_logging_in(&config, Some(&logs_dir));
        assert!(logs_dir.exists());

        // Only one global subscriber may be installed per process
        if first.is_ok() {
            let second = init_logging_in(&config, Some(&logs_dir));
            assert!(matches!(second, Err(ClientError::Config(_))));
        }
    }
}
