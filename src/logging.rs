//! Tracing setup for the CLI.
//!
//! Human-readable output goes to stderr. When a log directory is available,
//! JSON lines are also written to a daily-rolling file in it.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "taskpilot.log";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Force `debug` level regardless of `RUST_LOG`.
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
}

fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(options: &LogOptions) -> Option<WorkerGuard> {
    let log_dir = options
        .log_dir
        .as_ref()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter(options.verbose))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(file_layer)
        .init();

    if let (Some(dir), None) = (&options.log_dir, log_dir) {
        tracing::warn!(dir = %dir.display(), "log directory unavailable, file logging disabled");
    }
    guard
}
