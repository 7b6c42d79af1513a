//! Tracing subscriber setup for the host binary.
//!
//! Output goes to stderr; when a log directory is given, a daily-rolling
//! file is written as well through a non-blocking writer.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{Result, SalatError};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "salat=info,salat_sources=info";

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "salat.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SalatError::Config(format!("cannot install tracing subscriber: {e}")))?;

    Ok(guard)
}
