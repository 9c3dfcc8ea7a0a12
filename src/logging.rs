//! Logging infrastructure for tidyframe
//!
//! Logs go to the console and to rolling files. The file directory comes from
//! [`StorageConfig::log_dir`](crate::config::StorageConfig) when set, otherwise
//! from the platform data directory.
//!
//! ## Usage
//!
//! ```no_run
//! use tidyframe::logging;
//!
//! // Initialize once at startup
//! let _log_dir = logging::init(None).expect("Failed to initialize logging");
//!
//! tracing::info!("Started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the default log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/tidyframe/logs`
/// - macOS: `~/Library/Application Support/tidyframe/logs`
/// - Linux: `~/.local/share/tidyframe/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("tidyframe").join("logs"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Initializes console and file logging.
///
/// Creates two daily-rotated files, keeping 10 of each:
/// - `tidyframe.log`: every enabled level
/// - `error.log`: warnings and errors only
///
/// Returns the directory the files are written to.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a file appender fails
pub fn init(log_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = match log_dir {
        Some(dir) => dir.to_path_buf(),
        None => get_log_dir()?,
    };
    ensure_dir(&log_dir)?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("tidyframe")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    // Default to INFO, allow override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    // Console output goes to stderr so report output on stdout stays clean
    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Logging already initialized")?;

    tracing::info!("Logging initialized, log directory: {:?}", log_dir);

    Ok(log_dir)
}

/// Gets the path to today's log file inside `log_dir`
pub fn current_log_path(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    log_dir.join(format!("tidyframe.{today}.log"))
}
