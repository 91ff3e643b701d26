//! File logging.
//!
//! The terminal is in raw mode while koios runs, so logs only ever go to a daily rotating
//! file under the log directory.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Default filter when neither config nor environment sets one.
pub const DEFAULT_FILTER: &str = "info,koios=debug,tokio_postgres=warn,aws=warn,hyper=warn";

/// Must be held for the lifetime of the application; dropping it flushes pending entries.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Guard for a process that logs nowhere.
    pub fn disabled() -> Self {
        Self {
            _worker_guard: None,
        }
    }
}

/// Installs the global subscriber writing to `<log_dir>/koios.<date>.log`.
pub fn init_logging(log_dir: PathBuf, filter: Option<&str>) -> std::io::Result<LoggingGuard> {
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("koios")
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(std::io::Error::other)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(build_env_filter(filter))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(std::io::Error::other)?;

    Ok(LoggingGuard {
        _worker_guard: Some(guard),
    })
}

/// Priority: explicit filter > KOIOS_LOG > RUST_LOG > default.
pub fn build_env_filter(custom_filter: Option<&str>) -> EnvFilter {
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    }

    EnvFilter::try_from_env("KOIOS_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
