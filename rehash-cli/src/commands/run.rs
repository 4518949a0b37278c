//! Implementation of the batch run.
//!
//! Startup problems (unusable ffmpeg, bad settings, unwritable ledger) are
//! fatal and reported before any file is touched. A missing input directory
//! or an empty one ends the run normally with guidance. Everything that goes
//! wrong with a single file is reported per file and the batch carries on.

use crate::cli::RunArgs;
use crate::error::{CliResult, describe_fatal};
use crate::logging::attach_run_log;

use rehash_core::config::SUPPORTED_EXTENSIONS;
use rehash_core::processing::BatchSettings;
use rehash_core::{
    BatchReport, BatchStartInfo, BatchSummary, CompositeReporter, CoreConfig, CoreError,
    FailureRecord, FileLoggingReporter, JsonReporter, Ledger, LogRecord, ProcessResult, Reporter,
    SidecarSpawner, TerminalReporter, enumerate_jobs, resolve_ffmpeg, run_batch,
};
use rehash_core::file_logging::LoggingHandle;

use log::{debug, error, info};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The input directory did not exist and was created; nothing to do yet.
    InputCreated(PathBuf),
    /// The input directory holds no supported files.
    NothingToProcess,
    Completed(BatchSummary),
}

/// Runs one batch for `args`, reporting to the terminal (or JSON) and the run log.
///
/// The run log is attached to `logging` once the batch is about to start.
/// Fatal errors are reported before being returned.
pub fn run(
    args: RunArgs,
    spawner: &SidecarSpawner,
    logging: Option<&LoggingHandle>,
    cancel: &AtomicBool,
) -> CliResult<RunOutcome> {
    let reporter = build_reporter(&args);

    execute(&args, &reporter, spawner, logging, cancel).inspect_err(|e| {
        error!("Fatal: {e}");
        reporter.error(&describe_fatal(e));
    })
}

fn build_reporter(args: &RunArgs) -> CompositeReporter {
    let primary: Box<dyn Reporter> = if args.json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(TerminalReporter::new())
    };

    CompositeReporter::new()
        .with(primary)
        .with(Box::new(FileLoggingReporter::new()))
}

/// Creates and validates the core configuration from CLI arguments.
fn create_core_config(args: &RunArgs) -> CliResult<CoreConfig> {
    let mut config = CoreConfig::new(args.input_dir.clone(), args.output_dir.clone());
    config.mode = args.mode;
    config.intensity = args.intensity;
    config.threads = args.threads;
    config.scramble_audio = args.scramble_audio;
    config.job_timeout = args.job_timeout();
    config.log_failures = !args.no_failure_log;

    config.validate()?;
    Ok(config)
}

fn execute(
    args: &RunArgs,
    reporter: &dyn Reporter,
    spawner: &SidecarSpawner,
    logging: Option<&LoggingHandle>,
    cancel: &AtomicBool,
) -> CliResult<RunOutcome> {
    let config = create_core_config(args)?;

    if !config.input_dir.exists() {
        fs::create_dir_all(&config.input_dir).map_err(|e| {
            CoreError::PathError(format!(
                "Failed to create input directory '{}': {}",
                config.input_dir.display(),
                e
            ))
        })?;
        reporter.info(&format!(
            "Created input directory {}. Put videos there and run again.",
            config.input_dir.display()
        ));
        return Ok(RunOutcome::InputCreated(config.input_dir));
    }

    let ffmpeg = resolve_ffmpeg(args.ffmpeg.as_deref())?;

    let jobs = match enumerate_jobs(&config) {
        Ok(jobs) => jobs,
        Err(CoreError::NoFilesFound(dir)) => {
            reporter.info(&format!(
                "No supported video files in {} (looking for: {}).",
                dir.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            ));
            return Ok(RunOutcome::NothingToProcess);
        }
        Err(e) => return Err(e),
    };

    if let Some(logging) = logging.filter(|_| !args.no_log) {
        let path = attach_run_log(logging, &config.run_log_dir())?;
        debug!("Run log: {}", path.display());
    }
    info!("Using ffmpeg at {}", ffmpeg.display());
    debug!("Run started: {}", chrono::Local::now());

    let mut ledger = Ledger::open(&config.ledger_path())?;
    let mut failure_ledger = if config.log_failures {
        Some(Ledger::open_failures(&config.failure_ledger_path())?)
    } else {
        None
    };

    reporter.batch_started(&BatchStartInfo {
        total_files: jobs.len(),
        file_list: jobs.iter().map(|job| job.original_name()).collect(),
        output_dir: config.output_dir.display().to_string(),
        mode: config.mode,
        intensity: config.intensity,
        threads: config.threads,
    });

    let settings = BatchSettings::from_config(&config, ffmpeg);
    let summary = run_batch(
        spawner,
        &jobs,
        &settings,
        cancel,
        |result, index, total| {
            reporter.job_finished(result, index, total);
            record_result(&mut ledger, failure_ledger.as_mut(), result, reporter);
        },
    )?;

    reporter.batch_complete(&BatchReport {
        summary: summary.clone(),
        ledger_path: ledger.path().display().to_string(),
        failure_ledger_path: failure_ledger
            .as_ref()
            .map(|l| l.path().display().to_string()),
    });

    Ok(RunOutcome::Completed(summary))
}

/// Appends `result` to the matching ledger. A ledger write error is reported
/// but never stops the batch.
fn record_result(
    ledger: &mut Ledger,
    failure_ledger: Option<&mut Ledger>,
    result: &ProcessResult,
    reporter: &dyn Reporter,
) {
    let written = if let Some(record) = LogRecord::from_result(result) {
        ledger.append(&record).map_err(|e| (ledger.path().to_path_buf(), e))
    } else if let (Some(failures), Some(record)) =
        (failure_ledger, FailureRecord::from_result(result))
    {
        failures
            .append_failure(&record)
            .map_err(|e| (failures.path().to_path_buf(), e))
    } else {
        Ok(())
    };

    if let Err((path, e)) = written {
        reporter.warning(&format!(
            "Could not record {} in {}: {}",
            result.original_name,
            path.display(),
            e
        ));
    }
}
