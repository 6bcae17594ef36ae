//! Logging setup for batch runs.
//!
//! Uses tracing throughout. On Linux the subscriber prefers systemd's
//! journal so scheduled ingestion runs land in the system log; elsewhere,
//! or when journald is unreachable, a daily-rotated file under the data
//! directory is used instead.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// The filter comes from the `PHOTOTRAIL_LOG` environment variable
/// (`trace`, `debug`, `info`, `warn`, `error`), defaulting to `info`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("PHOTOTRAIL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    if let Ok(journald_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(journald_layer)
            .init();
        tracing::info!("logging to journald");
        return Ok(());
    }

    init_file_logging(env_filter, log_dir)
}

fn init_file_logging(env_filter: EnvFilter, log_dir: Option<PathBuf>) -> Result<()> {
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "phototrail.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard must outlive the process or buffered lines are lost;
    // init() runs once, so parking it in a static is enough
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("logging to {}", log_dir.display());
    Ok(())
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phototrail")
        .join("logs")
}
