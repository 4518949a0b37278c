// ============================================================================
// rehash-core/src/processing/worker.rs
// ============================================================================
//
// TRANSFORM WORKER: One Source File In, One Renamed Output Out
//
// For a single job the worker picks a free random output name, generates a
// fresh filter chain, runs ffmpeg and hashes the result. Every failure is
// folded into the returned `ProcessResult`; nothing here aborts the batch.
//
// A failed, timed-out or aborted job leaves no file behind in the output
// directory.

use super::{Job, JobFailure, JobOutcome, ProcessResult, TransformSuccess};
use crate::config::{DEFAULT_NAME_LENGTH, OUTPUT_EXTENSION};
use crate::external::{
    FfmpegProcess, FfmpegSpawner, ProcessExit, build_transform_command, command_args,
};
use crate::filters::FilterChain;
use crate::hashing::file_md5;
use crate::naming::random_file_name;

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Random names tried before giving up on finding a free output path.
pub const MAX_NAME_ATTEMPTS: usize = 5;

/// Transforms one job and reports the outcome.
pub fn process_job<S: FfmpegSpawner>(
    spawner: &S,
    ffmpeg_path: &Path,
    job: &Job,
    timeout: Option<Duration>,
) -> ProcessResult {
    let original_name = job.original_name();
    let started = Instant::now();

    let outcome = match transform(spawner, ffmpeg_path, job, timeout, started) {
        Ok(success) => {
            info!(
                "{} -> {} (md5 {}, {:.1}s)",
                original_name,
                success.new_name,
                success.content_hash,
                success.elapsed.as_secs_f64()
            );
            JobOutcome::Success(success)
        }
        Err(failure) => {
            warn!("{} failed: {}", original_name, failure);
            JobOutcome::Failed(failure)
        }
    };

    ProcessResult {
        original_name,
        source_path: job.source_path.clone(),
        mode: job.mode,
        outcome,
    }
}

fn transform<S: FfmpegSpawner>(
    spawner: &S,
    ffmpeg_path: &Path,
    job: &Job,
    timeout: Option<Duration>,
    started: Instant,
) -> Result<TransformSuccess, JobFailure> {
    let (output_path, new_name) = choose_output_path(&job.target_dir)?;
    let chain = FilterChain::random(job.mode, job.intensity, job.scramble_audio);
    let cmd = build_transform_command(ffmpeg_path, &job.source_path, &output_path, &chain);
    debug!("Running ffmpeg {}", command_args(&cmd).join(" "));

    let exit = spawner
        .spawn(cmd)
        .and_then(|mut process| process.wait_for_exit(timeout));

    let failure = match exit {
        Ok(ProcessExit::Finished(report)) if report.success => None,
        Ok(ProcessExit::Finished(report)) => Some(JobFailure::Encoding {
            exit_code: report.code,
            detail: last_line(&report.stderr_tail),
        }),
        Ok(ProcessExit::TimedOut) => Some(JobFailure::Timeout(timeout.unwrap_or_default())),
        Ok(ProcessExit::Aborted) => Some(JobFailure::Aborted),
        Err(e) => Some(JobFailure::Unexpected(e.to_string())),
    };
    if let Some(failure) = failure {
        remove_partial_output(&output_path);
        return Err(failure);
    }

    let finish = || -> std::io::Result<(String, u64)> {
        let content_hash = file_md5(&output_path)?;
        let output_size = std::fs::metadata(&output_path)?.len();
        Ok((content_hash, output_size))
    };

    match finish() {
        Ok((content_hash, output_size)) => Ok(TransformSuccess {
            new_name,
            output_path,
            content_hash,
            output_size,
            elapsed: started.elapsed(),
        }),
        Err(e) => {
            remove_partial_output(&output_path);
            Err(JobFailure::Unexpected(format!(
                "Failed to read output {}: {}",
                new_name, e
            )))
        }
    }
}

/// Picks a random output path in `dir` that does not exist yet.
fn choose_output_path(dir: &Path) -> Result<(PathBuf, String), JobFailure> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = random_file_name(DEFAULT_NAME_LENGTH, OUTPUT_EXTENSION);
        let path = dir.join(&name);
        if !path.exists() {
            return Ok((path, name));
        }
        debug!("Random name {} already taken, drawing again", name);
    }

    Err(JobFailure::Unexpected(format!(
        "No free output name in {} after {} attempts",
        dir.display(),
        MAX_NAME_ATTEMPTS
    )))
}

fn remove_partial_output(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
        }
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("ffmpeg reported an encoding error")
        .to_string()
}
