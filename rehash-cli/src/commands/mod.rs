//! Command implementations for the CLI.

/// The batch run: locate ffmpeg, enumerate inputs, transform, report.
pub mod run;
