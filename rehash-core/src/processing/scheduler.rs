// ============================================================================
// rehash-core/src/processing/scheduler.rs
// ============================================================================
//
// SCHEDULER: Bounded Parallel Dispatch of Transform Jobs
//
// Jobs run on a dedicated rayon pool with exactly `threads` workers, so at
// most that many ffmpeg processes exist at once. Jobs are queued in
// enumeration order; results travel back over a channel and the caller's
// callback runs on the calling thread in completion order.
//
// Interruption is cooperative: a job checks the cancel flag when a worker
// picks it up and is skipped if the flag is set. Jobs already running are
// left to finish unless the spawner's processes are aborted, in which case
// they come back as `JobFailure::Aborted`.

use super::worker::process_job;
use super::{Job, ProcessResult};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::FfmpegSpawner;

use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Everything the pool needs besides the jobs themselves.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub threads: usize,
    pub ffmpeg_path: PathBuf,
    pub timeout: Option<Duration>,
}

impl BatchSettings {
    pub fn from_config(config: &CoreConfig, ffmpeg_path: PathBuf) -> Self {
        Self {
            threads: config.threads,
            ffmpeg_path,
            timeout: config.job_timeout,
        }
    }
}

/// Counts for a finished (or interrupted) batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Jobs never started because of an interruption.
    pub fn skipped(&self) -> usize {
        self.total - self.dispatched
    }
}

/// Runs `jobs` on a pool of `settings.threads` workers.
///
/// `on_result(result, index, total)` is called once per finished job, with
/// `index` counting completions from 1. Only pool construction can fail.
pub fn run_batch<S, F>(
    spawner: &S,
    jobs: &[Job],
    settings: &BatchSettings,
    cancel: &AtomicBool,
    mut on_result: F,
) -> CoreResult<BatchSummary>
where
    S: FfmpegSpawner,
    F: FnMut(&ProcessResult, usize, usize),
{
    let total = jobs.len();
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads.max(1))
        .thread_name(|i| format!("rehash-worker-{i}"))
        .build()
        .map_err(|e| CoreError::OperationFailed(format!("Failed to start worker pool: {e}")))?;

    info!(
        "Processing {} file(s) with {} worker(s)",
        total, settings.threads
    );

    let dispatched = AtomicUsize::new(0);
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    pool.in_place_scope_fifo(|scope| {
        let (tx, rx) = mpsc::channel::<ProcessResult>();

        for job in jobs {
            let tx = tx.clone();
            let dispatched = &dispatched;
            scope.spawn_fifo(move |_| {
                if cancel.load(Ordering::SeqCst) {
                    debug!("Skipping {} after interruption", job.source_path.display());
                    return;
                }
                dispatched.fetch_add(1, Ordering::SeqCst);
                let result = process_job(spawner, &settings.ffmpeg_path, job, settings.timeout);
                // The receiver outlives every worker in this scope.
                tx.send(result).ok();
            });
        }
        drop(tx);

        for (completed, result) in rx.into_iter().enumerate() {
            if result.is_success() {
                succeeded += 1;
            } else {
                failed += 1;
            }
            on_result(&result, completed + 1, total);
        }
    });

    let summary = BatchSummary {
        total,
        dispatched: dispatched.load(Ordering::SeqCst),
        succeeded,
        failed,
        interrupted: cancel.load(Ordering::SeqCst),
        elapsed: started.elapsed(),
    };

    if summary.interrupted {
        info!(
            "Batch interrupted: {} of {} job(s) never started",
            summary.skipped(),
            total
        );
    }
    info!(
        "Batch finished: {} succeeded, {} failed in {:.1}s",
        summary.succeeded,
        summary.failed,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}
