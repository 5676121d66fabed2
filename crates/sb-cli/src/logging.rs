//! Subscriber setup
//!
//! Console and file output share one line format: timestamp, level,
//! `file:line` and the message. `RUST_LOG` overrides the `info` default.

use crate::config::Settings;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file name prefix
pub const LOG_FILE_PREFIX: &str = "slack-batch.log";

/// Rotated files kept on disk
pub const MAX_LOG_FILES: usize = 30;

/// Keeps the file writer flushing; drop it last
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Daily rotated appender in `dir`
///
/// # Errors
/// Fails if `dir` cannot be created or written.
pub fn file_appender(dir: &std::path::Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("failed to open log directory '{}'", dir.display()))
}

/// Install the global subscriber described by `settings`
///
/// # Errors
/// Fails if the log directory is unusable or a subscriber is already set.
pub fn init(settings: &Settings) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = settings.log_to_console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
    });

    let (file, guard) = if settings.log_to_file {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(&settings.log_dir)?);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_file(true)
            .with_line_number(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appender_writes_prefixed_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let mut appender = file_appender(dir.path()).unwrap();
        writeln!(appender, "hello").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(LOG_FILE_PREFIX));
    }
}
