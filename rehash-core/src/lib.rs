//! Core library for batch re-encoding of video files with fresh content hashes.
//!
//! This crate discovers video files, locates the ffmpeg binary, builds a
//! randomized filter chain per file, runs ffmpeg on a bounded worker pool and
//! records every successful transform in an append-only ledger.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rehash_core::{CoreConfig, SidecarSpawner, enumerate_jobs, resolve_ffmpeg, run_batch};
//! use rehash_core::processing::BatchSettings;
//! use std::path::PathBuf;
//! use std::sync::atomic::AtomicBool;
//!
//! let config = CoreConfig::new(PathBuf::from("input"), PathBuf::from("output"));
//! config.validate().unwrap();
//!
//! let ffmpeg = resolve_ffmpeg(None).unwrap();
//! let jobs = enumerate_jobs(&config).unwrap();
//! let settings = BatchSettings::from_config(&config, ffmpeg);
//! let cancel = AtomicBool::new(false);
//!
//! let summary = run_batch(&SidecarSpawner::new(), &jobs, &settings, &cancel, |result, index, total| {
//!     println!("[{index}/{total}] {}", result.original_name);
//! })
//! .unwrap();
//! println!("{} succeeded", summary.succeeded);
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod file_logging;
pub mod filters;
pub mod hashing;
pub mod locator;
pub mod naming;
pub mod processing;
pub mod reporting;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, Intensity, Mode};
pub use discovery::{enumerate_jobs, find_processable_files};
pub use error::{CoreError, CoreResult};
pub use external::{FfmpegProcess, FfmpegSpawner, ProcessRegistry, SidecarSpawner};
pub use filters::FilterChain;
pub use hashing::file_md5;
pub use locator::resolve_ffmpeg;
pub use naming::random_file_name;
pub use processing::{
    BatchSummary, Job, JobFailure, JobOutcome, ProcessResult, TransformSuccess, process_job,
    run_batch,
};
pub use reporting::{
    BatchReport, BatchStartInfo, CompositeReporter, JsonReporter, NullReporter, Reporter,
    ReporterError, TerminalReporter,
};
pub use reporting::ledger::{FailureRecord, Ledger, LogRecord};
pub use file_logging::FileLoggingReporter;
pub use utils::{format_bytes, format_duration};
