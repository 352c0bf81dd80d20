//! Operational logging.
//!
//! Events go to the console and are appended, one line each, to the service
//! log file. `RUST_LOG` overrides the default `info` level.

use crate::error::{ReportError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive in
/// `main` for the whole process.
///
/// # Arguments
/// * `service_log` - File the events are appended to
pub fn init_logging(service_log: &Path) -> Result<WorkerGuard> {
    let directory = service_log
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = service_log
        .file_name()
        .ok_or_else(|| {
            ReportError::ConfigError(format!(
                "Service log path has no file name: {}",
                service_log.display()
            ))
        })?
        .to_string_lossy()
        .into_owned();

    std::fs::create_dir_all(directory).map_err(|e| {
        ReportError::ConfigError(format!(
            "Failed to create log directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| {
            ReportError::ConfigError(format!(
                "Failed to open service log {}: {}",
                service_log.display(),
                e
            ))
        })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ReportError::Internal(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Console-only logging for commands that never mail, such as a local render.
/// Warnings and up by default, written to stderr.
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}
