pub mod setup;

pub use setup::{LoggingHandle, run_log_path, setup_logging};

use crate::reporting::{BatchReport, BatchStartInfo, Reporter, ReporterError};
use crate::processing::ProcessResult;
use crate::utils::format_duration;

use log::{debug, error, info, warn};

/// Mirrors batch-level reporter events into the run log.
///
/// Per-job outcomes are already logged by the worker, so `job_finished` only
/// records the completion index.
#[derive(Debug, Default)]
pub struct FileLoggingReporter;

impl FileLoggingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for FileLoggingReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        info!(
            "Starting batch of {} file(s), mode {}, intensity {}, {} worker(s)",
            info.total_files, info.mode, info.intensity, info.threads
        );
        for (i, filename) in info.file_list.iter().enumerate() {
            info!("  {}. {}", i + 1, filename);
        }
        info!("Output directory: {}", info.output_dir);
    }

    fn job_finished(&self, result: &ProcessResult, index: usize, total: usize) {
        debug!("Completed {}/{}: {}", index, total, result.original_name);
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, err: &ReporterError) {
        error!("{}: {}", err.title, err.message);
        if let Some(ctx) = &err.context {
            error!("Context: {}", ctx);
        }
        if let Some(sug) = &err.suggestion {
            error!("Suggestion: {}", sug);
        }
    }

    fn batch_complete(&self, report: &BatchReport) {
        let summary = &report.summary;
        info!(
            "Batch complete: {} of {} succeeded, {} failed",
            summary.succeeded, summary.total, summary.failed
        );
        if summary.interrupted {
            warn!("Interrupted: {} file(s) not started", summary.skipped());
        }
        info!("Elapsed: {}", format_duration(summary.elapsed.as_secs_f64()));
        info!("Ledger: {}", report.ledger_path);
        if let Some(path) = &report.failure_ledger_path {
            info!("Failure ledger: {}", path);
        }
    }
}
