//! Logging setup for Trellis.
//!
//! Logs go to stderr by default so they never mix with command output on
//! stdout. With `--log-file` they go to a file instead. `RUST_LOG`
//! overrides the default `info` filter either way.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "db-trellis";
const LOG_FILE: &str = "trellis.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Sends logs to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Sends logs to `path`, truncating it first.
///
/// Falls back to stderr if the file cannot be created.
pub fn init_file_logging(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    let log_file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {}: {e}", path.display());
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Default log file location.
///
/// Uses the XDG state directory on Linux, the config directory elsewhere
/// and the temp directory as a last resort.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join(APP_DIR).join(LOG_FILE);
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join(APP_DIR).join(LOG_FILE);
    }

    std::env::temp_dir().join(LOG_FILE)
}
