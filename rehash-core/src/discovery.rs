//! File discovery module for building the batch worklist.
//!
//! Scans the top level of the input directory for files whose extension is in
//! the supported set (case-insensitive) and turns them into `Job`s targeting
//! the output directory. Subdirectories are not searched.

use crate::config::{CoreConfig, SUPPORTED_EXTENSIONS};
use crate::error::{CoreError, CoreResult};
use crate::processing::Job;
use crate::utils::is_supported_video_file;

use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Finds supported video files in the top level of `input_dir`.
///
/// Returns the files sorted by path so dispatch order is stable between runs.
///
/// # Errors
///
/// * `CoreError::InputDirectoryMissing` - `input_dir` does not exist
/// * `CoreError::PathError` - `input_dir` is not a directory or cannot be read
/// * `CoreError::NoFilesFound` - nothing in the directory matched `extensions`
pub fn find_processable_files(input_dir: &Path, extensions: &[&str]) -> CoreResult<Vec<PathBuf>> {
    if !input_dir.exists() {
        return Err(CoreError::InputDirectoryMissing(input_dir.to_path_buf()));
    }

    if !input_dir.is_dir() {
        return Err(CoreError::PathError(format!(
            "{} is not a directory",
            input_dir.display()
        )));
    }

    let read_dir = std::fs::read_dir(input_dir).map_err(|e| {
        CoreError::PathError(format!(
            "Cannot read directory {}: {}",
            input_dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    let mut skipped_count = 0usize;

    for entry_result in read_dir {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if is_supported_video_file(&path, extensions) {
                    files.push(path);
                } else {
                    skipped_count += 1;
                }
            }
            Err(e) => warn!(
                "Failed to read directory entry in {}: {}",
                input_dir.display(),
                e
            ),
        }
    }

    debug!(
        "Discovery in {}: {} supported, {} skipped",
        input_dir.display(),
        files.len(),
        skipped_count
    );

    if files.is_empty() {
        return Err(CoreError::NoFilesFound(input_dir.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Builds the ordered worklist for `config` and makes sure the output
/// directory (including missing parents) exists.
pub fn enumerate_jobs(config: &CoreConfig) -> CoreResult<Vec<Job>> {
    let files = find_processable_files(&config.input_dir, SUPPORTED_EXTENSIONS)?;

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        CoreError::PathError(format!(
            "Failed to create output directory '{}': {}",
            config.output_dir.display(),
            e
        ))
    })?;

    Ok(files
        .into_iter()
        .map(|source_path| Job::from_config(source_path, config))
        .collect())
}
