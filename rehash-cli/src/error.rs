// ============================================================================
// rehash-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result alias and user-facing error presentation
//
// The CLI shares `CoreError` with the core library. Fatal errors are turned
// into a `ReporterError` with a title and, where one exists, a suggestion the
// user can act on.

use rehash_core::{CoreError, CoreResult, ReporterError};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Builds the message shown for a fatal error.
pub fn describe_fatal(error: &CoreError) -> ReporterError {
    match error {
        CoreError::InvalidExecutable(path) => ReporterError::new(
            "ffmpeg not usable",
            format!("{} is not an executable file", path.display()),
        )
        .with_suggestion("Check the path passed to --ffmpeg"),
        CoreError::ExecutableNotFound(name) => ReporterError::new(
            "ffmpeg not found",
            format!("'{name}' is not on PATH or in the current directory"),
        )
        .with_suggestion("Install ffmpeg or pass its location with --ffmpeg"),
        CoreError::Config(message) => ReporterError::new("Invalid settings", message.clone()),
        other => ReporterError::new("Run failed", other.to_string()),
    }
}
