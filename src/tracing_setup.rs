//! Tracing setup for spindrift.
//!
//! Console output at a caller-chosen level plus a full-debug log file on
//! disk, so scheduler decisions can be reconstructed after a playback
//! session without cluttering the host application's output.

use std::fs::{File, create_dir_all};
use std::path::Path;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Initialize tracing with dual output: console (caller level) + file
/// (full debug).
///
/// Writes complete debug logs to `<logs_dir>/spindrift-last-run.log`,
/// overwriting the previous run. `logs_dir` defaults to `./logs`.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the logs directory or log file
///   cannot be created, or a global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file = File::create(logs_path.join("spindrift-last-run.log"))?;

    // Console layer respects the caller's chosen level, overridable via
    // RUST_LOG.
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    // File layer always captures everything down to TRACE.
    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
