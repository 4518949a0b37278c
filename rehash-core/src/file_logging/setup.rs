use crate::error::{CoreError, CoreResult};

use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use std::path::{Path, PathBuf};

const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";
const CONSOLE_PATTERN: &str = "[{l}] {m}{n}";

/// Path of the run log for a run started at `timestamp` (`YYYYmmdd_HHMMSS`).
pub fn run_log_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("rehash_run_{timestamp}.log"))
}

/// The installed global logger. A run log can be attached once its
/// directory is known; records logged before that only reach stderr.
pub struct LoggingHandle {
    handle: log4rs::Handle,
    console_level: LevelFilter,
}

impl LoggingHandle {
    /// Starts writing records at `file_level` and above to `log_file` too.
    pub fn attach_log_file(&self, log_file: &Path, file_level: LevelFilter) -> CoreResult<()> {
        let config = build_config(Some(log_file), file_level, self.console_level)?;
        self.handle.set_config(config);
        Ok(())
    }
}

/// Installs the global logger.
///
/// Records at `console_level` and above go to stderr. When `log_file` is
/// given, records at `file_level` and above are also written there.
pub fn setup_logging(
    log_file: Option<&Path>,
    file_level: LevelFilter,
    console_level: LevelFilter,
) -> CoreResult<LoggingHandle> {
    let config = build_config(log_file, file_level, console_level)?;
    let handle = log4rs::init_config(config)
        .map_err(|e| CoreError::OperationFailed(format!("Failed to install logger: {e}")))?;

    Ok(LoggingHandle {
        handle,
        console_level,
    })
}

fn build_config(
    log_file: Option<&Path>,
    file_level: LevelFilter,
    console_level: LevelFilter,
) -> CoreResult<Config> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(console_level)))
            .build("console", Box::new(console)),
    );
    let mut root = Root::builder().appender("console");
    let mut root_level = console_level;

    if let Some(log_file) = log_file {
        // Create log directory if it doesn't exist
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // File appender with clean format for log files
        let file_appender = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(log_file)?;

        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("file", Box::new(file_appender)),
        );
        root = root.appender("file");
        root_level = root_level.max(file_level);
    }

    builder
        .build(root.build(root_level))
        .map_err(|e| CoreError::OperationFailed(format!("Invalid logging configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_path() {
        assert_eq!(
            run_log_path(Path::new("output/logs"), "20240501_120000"),
            PathBuf::from("output/logs/rehash_run_20240501_120000.log")
        );
    }

    #[test]
    fn test_build_config_levels() {
        let dir = tempfile::tempdir().unwrap();

        let console_only = build_config(None, LevelFilter::Debug, LevelFilter::Warn).unwrap();
        assert_eq!(console_only.root().level(), LevelFilter::Warn);
        assert_eq!(console_only.appenders().len(), 1);

        let log_file = dir.path().join("logs").join("run.log");
        let with_file = build_config(Some(&log_file), LevelFilter::Debug, LevelFilter::Warn).unwrap();
        assert_eq!(with_file.root().level(), LevelFilter::Debug);
        assert_eq!(with_file.appenders().len(), 2);
        assert!(log_file.exists(), "the file appender creates its log");
    }

    // The only test in this crate that installs the global logger.
    #[test]
    fn test_run_log_attached_after_startup() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = run_log_path(&dir.path().join("logs"), "20240501_120000");

        let logging = setup_logging(None, LevelFilter::Debug, LevelFilter::Off).unwrap();
        log::info!("before the run log");
        assert!(!log_file.exists());

        logging.attach_log_file(&log_file, LevelFilter::Debug).unwrap();
        log::info!("after the run log");

        let content = std::fs::read_to_string(&log_file).unwrap();
        assert!(content.contains("[INFO] after the run log"));
        assert!(!content.contains("before the run log"));
    }
}
