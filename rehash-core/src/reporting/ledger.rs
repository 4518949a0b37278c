//! Append-only CSV ledgers.
//!
//! The processing ledger gets one row per successful transform and is shared
//! by every run that targets the same output directory: it is never truncated
//! and its header is written only when the file is empty. The failure ledger
//! follows the same rules with its own columns.
//!
//! A `Ledger` is written from a single thread (the scheduler's caller), so
//! rows never interleave.

use crate::config::Mode;
use crate::error::{CoreError, CoreResult};
use crate::processing::{JobOutcome, ProcessResult};

use chrono::Local;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the processing ledger.
pub const LEDGER_HEADER: &[&str] = &["timestamp", "original_name", "new_name", "md5", "mode"];

/// Header of the failure ledger.
pub const FAILURE_LEDGER_HEADER: &[&str] = &["timestamp", "original_name", "reason", "mode"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the processing ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub original_name: String,
    pub new_name: String,
    pub content_hash: String,
    pub mode: Mode,
}

impl LogRecord {
    /// Builds a record stamped with the current local time, or `None` for a
    /// failed result.
    pub fn from_result(result: &ProcessResult) -> Option<Self> {
        let success = result.success()?;
        Some(Self {
            timestamp: now(),
            original_name: result.original_name.clone(),
            new_name: success.new_name.clone(),
            content_hash: success.content_hash.clone(),
            mode: result.mode,
        })
    }

    fn fields(&self) -> [&str; 5] {
        [
            self.timestamp.as_str(),
            self.original_name.as_str(),
            self.new_name.as_str(),
            self.content_hash.as_str(),
            self.mode.as_str(),
        ]
    }
}

/// One row of the failure ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub timestamp: String,
    pub original_name: String,
    pub reason: String,
    pub mode: Mode,
}

impl FailureRecord {
    /// Builds a record for a failed result, or `None` for a success.
    pub fn from_result(result: &ProcessResult) -> Option<Self> {
        match &result.outcome {
            JobOutcome::Success(_) => None,
            JobOutcome::Failed(failure) => Some(Self {
                timestamp: now(),
                original_name: result.original_name.clone(),
                reason: failure.to_string(),
                mode: result.mode,
            }),
        }
    }

    fn fields(&self) -> [&str; 4] {
        [
            self.timestamp.as_str(),
            self.original_name.as_str(),
            self.reason.as_str(),
            self.mode.as_str(),
        ]
    }
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Append handle on a CSV ledger file.
pub struct Ledger {
    path: PathBuf,
    file: File,
    rows_written: usize,
}

impl Ledger {
    /// Opens the processing ledger at `path`.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_header(path, LEDGER_HEADER)
    }

    /// Opens the failure ledger at `path`.
    pub fn open_failures(path: &Path) -> CoreResult<Self> {
        Self::open_with_header(path, FAILURE_LEDGER_HEADER)
    }

    /// Opens `path` for appending, creating it (and its parent directories)
    /// if needed. `header` is written only when the file is empty.
    pub fn open_with_header(path: &Path, header: &[&str]) -> CoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                CoreError::PathError(format!("Cannot open ledger {}: {}", path.display(), e))
            })?;

        if file.metadata()?.len() == 0 {
            write_row(&mut file, header)?;
            log::debug!("Created ledger {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows appended through this handle.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn append(&mut self, record: &LogRecord) -> CoreResult<()> {
        self.append_fields(&record.fields())
    }

    pub fn append_failure(&mut self, record: &FailureRecord) -> CoreResult<()> {
        self.append_fields(&record.fields())
    }

    fn append_fields(&mut self, fields: &[&str]) -> CoreResult<()> {
        write_row(&mut self.file, fields)?;
        self.rows_written += 1;
        Ok(())
    }
}

fn write_row(file: &mut File, fields: &[&str]) -> CoreResult<()> {
    let line = fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(file, "{line}")?;
    file.flush()?;
    Ok(())
}

/// Quotes a CSV field when it contains a comma, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
