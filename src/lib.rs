//! stockchart library
//!
//! Streaming stock chart: a STOMP push channel and a chart REST API feed a
//! windowed history store that drives synchronized price and volume panes.

pub mod chart;
pub mod cli;
pub mod config;
pub mod feed;
pub mod market_data;
pub mod metrics;
pub mod session;
pub mod ui;

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

/// Application result type for consistent error handling
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize tracing subscriber for logging
///
/// Logs always go to `file_path`. Stderr output is added when `to_stderr`
/// is set, which must stay off while the TUI owns the terminal. The
/// returned guard flushes the file writer on drop.
pub fn init_logging(level: &str, file_path: &str, to_stderr: bool) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let path = Path::new(file_path);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", file_path))?;
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("stockchart={}", level).into());

    let stderr_layer = to_stderr.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}
