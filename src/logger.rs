use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Targets, fmt, prelude::*};

use crate::constants::LOG_DIR;

const LOG_FILE_PREFIX: &str = "fvh-claimer.log";

/// Console at INFO plus a daily rolling file at DEBUG for this crate.
/// The returned guard flushes the file writer and must outlive the program.
pub fn init_default_logger() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), Level::DEBUG)
        .with_default(Level::WARN);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);

    let console_filter = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), Level::INFO)
        .with_default(Level::ERROR);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
