//! Batch processing: jobs, per-job results and the worker pool.
//!
//! A `Job` is built for every discovered file and handed to exactly one
//! worker invocation. The worker never returns an error; whatever happens to
//! the job ends up in the `ProcessResult` it produces.

use crate::config::{CoreConfig, Intensity, Mode};
use crate::utils::get_filename_safe;

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Single-file transform and its helpers
pub mod worker;

/// Bounded worker pool dispatching jobs and collecting results
pub mod scheduler;

pub use scheduler::{BatchSettings, BatchSummary, run_batch};
pub use worker::process_job;

/// One input file to transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source_path: PathBuf,
    pub target_dir: PathBuf,
    pub mode: Mode,
    pub intensity: Intensity,
    pub scramble_audio: bool,
}

impl Job {
    pub fn from_config(source_path: PathBuf, config: &CoreConfig) -> Self {
        Self {
            source_path,
            target_dir: config.output_dir.clone(),
            mode: config.mode,
            intensity: config.intensity,
            scramble_audio: config.scramble_audio,
        }
    }

    /// File name of the source, used in every report about this job.
    pub fn original_name(&self) -> String {
        original_name_of(&self.source_path)
    }
}

fn original_name_of(path: &Path) -> String {
    get_filename_safe(path).unwrap_or_else(|_| path.display().to_string())
}

/// Metadata of a completed transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSuccess {
    pub new_name: String,
    pub output_path: PathBuf,
    /// Lowercase hex MD5 of the output file.
    pub content_hash: String,
    pub output_size: u64,
    pub elapsed: Duration,
}

/// Why a job produced no output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobFailure {
    #[error("Encoding failed{}: {detail}", exit_code_suffix(.exit_code))]
    Encoding {
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// ffmpeg was killed because the whole run was aborted.
    #[error("Aborted before completion")]
    Aborted,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success(TransformSuccess),
    Failed(JobFailure),
}

/// Terminal report for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    pub original_name: String,
    pub source_path: PathBuf,
    pub mode: Mode,
    pub outcome: JobOutcome,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&TransformSuccess> {
        match &self.outcome {
            JobOutcome::Success(success) => Some(success),
            JobOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match &self.outcome {
            JobOutcome::Success(_) => None,
            JobOutcome::Failed(failure) => Some(failure),
        }
    }
}
