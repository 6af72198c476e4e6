//! Host `tracing` subscriber.
//!
//! Installs console output plus NDJSON files rotated daily, with the level
//! taken from `RUST_LOG` when set. Records forwarded by
//! [`TracingEmitter`](crate::TracingEmitter) land here under the `advlog`
//! target.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix for the rolling log, e.g. `advlog.log.2026-10-19`.
pub const LOG_FILE_NAME: &str = "advlog.log";

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_tracing<P: AsRef<Path>>(log_dir: P, level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
}
