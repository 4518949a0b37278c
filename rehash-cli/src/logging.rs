// ============================================================================
// rehash-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: run-log naming and logger installation
//
// Diagnostics go through the `log` facade and are routed by log4rs: warnings
// (or everything from debug up with --verbose) to stderr, and the full debug
// stream to the run log under OUTPUT/logs unless --no-log is given.
//
// The stderr logger is installed before anything else runs; the run log is
// attached later, once the run is known to touch the output directory.

use crate::error::CliResult;

use log::LevelFilter;
use rehash_core::file_logging::{LoggingHandle, run_log_path, setup_logging};
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn console_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Installs the global logger with the stderr appender only.
pub fn init_console_logging(verbose: bool) -> CliResult<LoggingHandle> {
    setup_logging(None, LevelFilter::Debug, console_level(verbose))
}

/// Adds a timestamped run log under `log_dir` and returns its path.
pub fn attach_run_log(logging: &LoggingHandle, log_dir: &Path) -> CliResult<PathBuf> {
    let log_file = run_log_path(log_dir, &get_timestamp());
    logging.attach_log_file(&log_file, LevelFilter::Debug)?;
    Ok(log_file)
}
