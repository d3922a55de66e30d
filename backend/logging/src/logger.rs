//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional daily-rolling JSON
//! files, and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Rolled daily to `<dir>/srs-verifier.log.YYYY-MM-DD`.
pub const LOG_FILE_NAME: &str = "srs-verifier.log";

/// Initialize the global logger.
///
/// `RUST_LOG` wins over `level`. Console output goes to stderr so stdout stays
/// free for command output. A second init is a no-op.
pub fn init_logger(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
