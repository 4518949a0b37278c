//! FFmpeg command builder utilities
//!
//! Every invocation starts from `FfmpegCommandBuilder`, which pins the
//! resolved binary path and adds the flags that keep ffmpeg quiet and
//! non-interactive. `build_transform_command` then lays out one transform:
//! input, filter chain and codec arguments, and the destination last.

use crate::filters::FilterChain;

use ffmpeg_sidecar::command::FfmpegCommand;
use std::ffi::OsString;
use std::path::Path;

/// Builder for creating `FFmpeg` commands with common configurations
pub struct FfmpegCommandBuilder {
    cmd: FfmpegCommand,
    hide_banner: bool,
    quiet: bool,
}

impl FfmpegCommandBuilder {
    /// Creates a builder for the binary at `ffmpeg_path`
    #[must_use]
    pub fn new(ffmpeg_path: &Path) -> Self {
        Self {
            cmd: FfmpegCommand::new_with_path(ffmpeg_path),
            hide_banner: true,
            quiet: true,
        }
    }

    /// Sets whether to hide the `FFmpeg` banner
    #[must_use]
    pub fn with_hide_banner(mut self, hide: bool) -> Self {
        self.hide_banner = hide;
        self
    }

    /// Restricts ffmpeg's stderr to errors only
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Builds the `FFmpeg` command with all configured options
    #[must_use]
    pub fn build(mut self) -> FfmpegCommand {
        if self.hide_banner {
            self.cmd.arg("-hide_banner");
        }
        self.cmd.arg("-nostdin");
        if self.quiet {
            self.cmd.args(["-loglevel", "error"]);
        }
        self.cmd
    }
}

/// Builds the full command transforming `input` into `output` with `chain`.
///
/// Overwrite is enabled and the output path is always the final argument.
/// Both paths are passed through untouched, so names that are not valid
/// UTF-8 reach ffmpeg byte for byte.
#[must_use]
pub fn build_transform_command(
    ffmpeg_path: &Path,
    input: &Path,
    output: &Path,
    chain: &FilterChain,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommandBuilder::new(ffmpeg_path).build();
    cmd.arg("-i").arg(input);
    cmd.args(chain.output_args());
    cmd.overwrite();
    cmd.arg(output);
    cmd
}

/// Arguments of `cmd` as owned strings, for logging and inspection.
pub fn command_args(cmd: &FfmpegCommand) -> Vec<String> {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Arguments of `cmd` exactly as they will be passed to the process.
pub fn command_os_args(cmd: &FfmpegCommand) -> Vec<OsString> {
    cmd.get_args().map(|arg| arg.to_os_string()).collect()
}
