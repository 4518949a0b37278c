//! Locating the ffmpeg executable.
//!
//! Resolution order: an explicit path supplied by the user, then the system
//! search path, then a binary dropped next to the working directory. Any
//! failure here is fatal for the run.

use crate::error::{CoreError, CoreResult};

use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name looked up on the search path.
pub const FFMPEG_BINARY_NAME: &str = "ffmpeg";

/// File checked in the working directory when the search path has no ffmpeg.
pub const LOCAL_FFMPEG_FILENAME: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// Resolves the ffmpeg binary using the process environment.
pub fn resolve_ffmpeg(custom_path: Option<&Path>) -> CoreResult<PathBuf> {
    let cwd = std::env::current_dir()?;
    resolve_ffmpeg_in(custom_path, std::env::var_os("PATH"), &cwd)
}

/// Resolves the ffmpeg binary against an explicit search path and working directory.
///
/// # Errors
///
/// * `CoreError::InvalidExecutable` - `custom_path` is not an executable file
/// * `CoreError::ExecutableNotFound` - neither the search path nor `cwd` has ffmpeg
pub fn resolve_ffmpeg_in(
    custom_path: Option<&Path>,
    search_path: Option<OsString>,
    cwd: &Path,
) -> CoreResult<PathBuf> {
    if let Some(path) = custom_path {
        if is_executable_file(path) {
            debug!("Using explicit ffmpeg path: {}", path.display());
            return Ok(path.to_path_buf());
        }
        return Err(CoreError::InvalidExecutable(path.to_path_buf()));
    }

    if let Ok(path) = which::which_in(FFMPEG_BINARY_NAME, search_path, cwd) {
        debug!("Found ffmpeg on search path: {}", path.display());
        return Ok(path);
    }

    let local = cwd.join(LOCAL_FFMPEG_FILENAME);
    if is_executable_file(&local) {
        info!("Using ffmpeg from working directory: {}", local.display());
        return Ok(local);
    }

    Err(CoreError::ExecutableNotFound(FFMPEG_BINARY_NAME.to_string()))
}

/// True if `path` is a regular file that the current user may execute.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
