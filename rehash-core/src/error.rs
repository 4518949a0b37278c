//! Error types for the rehash-core library.
//!
//! `CoreError` covers startup and batch-level failures. Failures of a single
//! transform are not errors at this level: they are captured by the worker as
//! a `JobFailure` inside the job's `ProcessResult`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid ffmpeg executable: {0}")]
    InvalidExecutable(PathBuf),

    #[error("'{0}' not found on PATH or in the current directory")]
    ExecutableNotFound(String),

    #[error("Input directory does not exist: {0}")]
    InputDirectoryMissing(PathBuf),

    #[error("No supported video files found in {0}")]
    NoFilesFound(PathBuf),

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, io::Error),

    #[error("Failed while waiting for {0}: {1}")]
    CommandWait(String, io::Error),

    #[error("{0}")]
    OperationFailed(String),
}

/// Result type for rehash-core operations
pub type CoreResult<T> = Result<T, CoreError>;

pub fn command_start_error(cmd: &str, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.to_string(), err)
}

pub fn command_wait_error(cmd: &str, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.to_string(), err)
}
