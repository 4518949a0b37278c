use crate::config::{Intensity, Mode};
use crate::processing::{BatchSummary, JobOutcome, ProcessResult};
use crate::utils::{format_bytes, format_duration};

use console::{StyledObject, Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Append-only CSV ledgers of processed and failed files.
pub mod ledger;

/// Batch start metadata.
#[derive(Clone, Debug)]
pub struct BatchStartInfo {
    pub total_files: usize,
    pub file_list: Vec<String>,
    pub output_dir: String,
    pub mode: Mode,
    pub intensity: Intensity,
    pub threads: usize,
}

/// Batch completion data: counts plus where the ledgers live.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub ledger_path: String,
    pub failure_ledger_path: Option<String>,
}

/// High-level warning/error message.
#[derive(Clone, Debug)]
pub struct ReporterError {
    pub title: String,
    pub message: String,
    pub context: Option<String>,
    pub suggestion: Option<String>,
}

impl ReporterError {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            context: None,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Reporter interface implemented by both human-readable and JSON reporters.
pub trait Reporter: Send + Sync {
    fn batch_started(&self, _info: &BatchStartInfo) {}
    fn job_finished(&self, _result: &ProcessResult, _index: usize, _total: usize) {}
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _error: &ReporterError) {}
    fn batch_complete(&self, _report: &BatchReport) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Forwards every event to each inner reporter, in order.
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl Reporter for CompositeReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.reporters.iter().for_each(|r| r.batch_started(info));
    }

    fn job_finished(&self, result: &ProcessResult, index: usize, total: usize) {
        self.reporters
            .iter()
            .for_each(|r| r.job_finished(result, index, total));
    }

    fn info(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.info(message));
    }

    fn warning(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.warning(message));
    }

    fn error(&self, error: &ReporterError) {
        self.reporters.iter().for_each(|r| r.error(error));
    }

    fn batch_complete(&self, report: &BatchReport) {
        self.reporters.iter().for_each(|r| r.batch_complete(report));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Human-friendly reporter that prints concise text output.
///
/// A progress bar is shown only when stdout is a terminal. Colors are off
/// when `NO_COLOR` is set.
pub struct TerminalReporter {
    progress: Mutex<Option<ProgressBar>>,
    interactive: bool,
    colors: bool,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
            interactive: Term::stdout().is_term(),
            colors: std::env::var_os("NO_COLOR").is_none(),
        }
    }

    fn paint<D>(&self, styled: StyledObject<D>) -> StyledObject<D> {
        if self.colors {
            styled
        } else {
            styled.force_styling(false)
        }
    }

    /// Prints a line without tearing the progress bar.
    fn print(&self, line: String) {
        match lock(&self.progress).as_ref() {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn finish_progress(&self) {
        if let Some(pb) = lock(&self.progress).take() {
            pb.finish_and_clear();
        }
    }
}

impl Reporter for TerminalReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        println!("\n{}", self.paint(style("BATCH").bold().cyan()));
        let settings = match info.mode {
            Mode::Fast => info.mode.to_string(),
            Mode::Advanced => format!("{}, intensity {}", info.mode, info.intensity),
        };
        println!(
            "  Processing {} file(s) -> {} ({}, {} worker(s))",
            info.total_files,
            self.paint(style(&info.output_dir).bold()),
            settings,
            info.threads
        );

        if self.interactive && info.total_files > 0 {
            let pb = ProgressBar::new(info.total_files as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("[{bar:40}] {pos}/{len} {msg}")
            {
                pb.set_style(bar_style.progress_chars("=> "));
            }
            *lock(&self.progress) = Some(pb);
        }
    }

    fn job_finished(&self, result: &ProcessResult, index: usize, total: usize) {
        let tag = format!("[{index}/{total}]");
        match &result.outcome {
            JobOutcome::Success(success) => {
                self.print(format!(
                    "{} {} {} -> {}",
                    self.paint(style(tag).dim()),
                    self.paint(style("✓").green().bold()),
                    result.original_name,
                    self.paint(style(&success.new_name).green())
                ));
                self.print(format!(
                    "      md5 {} ({})",
                    self.paint(style(&success.content_hash).dim()),
                    format_bytes(success.output_size)
                ));
            }
            JobOutcome::Failed(failure) => {
                self.print(format!(
                    "{} {} {}: {}",
                    self.paint(style(tag).dim()),
                    self.paint(style("✗").red().bold()),
                    result.original_name,
                    self.paint(style(failure.to_string()).red())
                ));
            }
        }

        if let Some(pb) = lock(&self.progress).as_ref() {
            pb.set_position(index as u64);
        }
    }

    fn info(&self, message: &str) {
        self.print(format!("{} {}", self.paint(style("ℹ").cyan()), message));
    }

    fn warning(&self, message: &str) {
        self.print(
            self.paint(style(format!("WARN: {message}")).yellow().bold())
                .to_string(),
        );
    }

    fn error(&self, error: &ReporterError) {
        eprintln!(
            "\n{} {}",
            self.paint(style("ERROR").red().bold()),
            self.paint(style(&error.title).red().bold())
        );
        eprintln!("  {}", error.message);
        if let Some(ctx) = &error.context {
            eprintln!("  Context: {ctx}");
        }
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  Suggestion: {suggestion}");
        }
    }

    fn batch_complete(&self, report: &BatchReport) {
        self.finish_progress();
        let summary = &report.summary;

        println!("\n{}", self.paint(style("SUMMARY").bold().cyan()));
        println!(
            "  {}",
            self.paint(
                style(format!(
                    "{} of {} succeeded, {} failed",
                    summary.succeeded, summary.total, summary.failed
                ))
                .bold()
            )
        );
        if summary.interrupted {
            println!(
                "  {}",
                self.paint(
                    style(format!(
                        "Interrupted: {} file(s) not started",
                        summary.skipped()
                    ))
                    .yellow()
                )
            );
        }
        println!(
            "  Time: {}",
            format_duration(summary.elapsed.as_secs_f64())
        );
        println!("  Log: {}", self.paint(style(&report.ledger_path).green()));
        if let Some(path) = &report.failure_ledger_path {
            if summary.failed > 0 {
                println!("  Failures: {}", self.paint(style(path).yellow()));
            }
        }
    }
}

/// Line-delimited JSON reporter for machine consumers.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_value(&self, value: serde_json::Value) {
        let mut writer = lock(&self.writer);
        if let Err(e) = writeln!(writer, "{value}").and_then(|()| writer.flush()) {
            log::warn!("Failed to write JSON event: {}", e);
        }
    }
}

impl Reporter for JsonReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.write_value(json!({
            "type": "batch_started",
            "total_files": info.total_files,
            "files": info.file_list,
            "output_dir": info.output_dir,
            "mode": info.mode,
            "intensity": info.intensity,
            "threads": info.threads,
            "timestamp": Self::timestamp(),
        }));
    }

    fn job_finished(&self, result: &ProcessResult, index: usize, total: usize) {
        let value = match &result.outcome {
            JobOutcome::Success(success) => json!({
                "type": "job_finished",
                "status": "success",
                "index": index,
                "total": total,
                "original_name": result.original_name,
                "new_name": success.new_name,
                "content_hash": success.content_hash,
                "output_size": success.output_size,
                "elapsed_seconds": success.elapsed.as_secs_f64(),
                "timestamp": Self::timestamp(),
            }),
            JobOutcome::Failed(failure) => json!({
                "type": "job_finished",
                "status": "error",
                "index": index,
                "total": total,
                "original_name": result.original_name,
                "error": failure.to_string(),
                "timestamp": Self::timestamp(),
            }),
        };
        self.write_value(value);
    }

    fn info(&self, message: &str) {
        self.write_value(json!({
            "type": "info",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn error(&self, error: &ReporterError) {
        self.write_value(json!({
            "type": "error",
            "title": error.title,
            "message": error.message,
            "context": error.context,
            "suggestion": error.suggestion,
            "timestamp": Self::timestamp(),
        }));
    }

    fn batch_complete(&self, report: &BatchReport) {
        let summary = &report.summary;
        self.write_value(json!({
            "type": "batch_complete",
            "total_files": summary.total,
            "dispatched": summary.dispatched,
            "succeeded": summary.succeeded,
            "failed": summary.failed,
            "interrupted": summary.interrupted,
            "elapsed_seconds": summary.elapsed.as_secs_f64(),
            "ledger_path": report.ledger_path,
            "failure_ledger_path": report.failure_ledger_path,
            "timestamp": Self::timestamp(),
        }));
    }
}
