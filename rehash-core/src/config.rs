//! Configuration structures and constants for the rehash-core library.
//!
//! This module defines the processing modes, intensity tiers and the
//! randomization ranges that drive filter-chain generation, together with the
//! `CoreConfig` structure consumers build and pass into the batch pipeline.

use crate::error::CoreError;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// Default constants

/// Default directory scanned for input videos.
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default directory receiving transformed videos and the ledgers.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default number of concurrent ffmpeg invocations.
pub const DEFAULT_THREADS: usize = 3;

/// Upper bound on the worker pool size accepted by `CoreConfig::validate`.
pub const MAX_THREADS: usize = 64;

/// Length of the random base name given to every output file.
pub const DEFAULT_NAME_LENGTH: usize = 12;

/// Extension given to every output file regardless of the input container.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Input extensions picked up by discovery (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];

/// Ledger of successful transforms, kept inside the output directory.
pub const LEDGER_FILENAME: &str = "processed_log.csv";

/// Companion ledger of failed transforms.
pub const FAILURE_LEDGER_FILENAME: &str = "failed_log.csv";

/// Subdirectory of the output directory holding per-run diagnostic logs.
pub const RUN_LOG_DIRNAME: &str = "logs";

/// Fixed visual adjustment applied in fast mode.
pub const FAST_MODE_FILTER: &str = "eq=brightness=0.005:contrast=1.005";

/// Contrast multiplier range sampled in advanced mode.
pub const CONTRAST_RANGE: RangeInclusive<f64> = 0.98..=1.02;

/// Brightness offset range sampled in advanced mode.
pub const BRIGHTNESS_RANGE: RangeInclusive<f64> = 0.005..=0.020;

/// Range of the audio volume deviation from 1.0 when audio is re-encoded.
pub const VOLUME_DELTA_RANGE: RangeInclusive<f64> = 0.005..=0.020;

/// x264 preset and CRF used in fast mode.
pub const FAST_X264_PRESET: &str = "ultrafast";
pub const FAST_X264_CRF: u8 = 22;

/// x264 preset and CRF used in advanced mode.
pub const ADVANCED_X264_PRESET: &str = "veryfast";
pub const ADVANCED_X264_CRF: u8 = 21;

/// Bitrate for re-encoded AAC audio.
pub const AUDIO_BITRATE: &str = "128k";

/// Processing mode selecting how aggressively each file is perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fixed minimal visual tweak, audio stream copied.
    Fast,
    /// Randomized visual perturbation, noise, crop/zoom and re-encoded audio.
    Advanced,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Advanced => "advanced",
        }
    }

    pub const fn variants_display() -> &'static str {
        "fast, advanced"
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("fast") {
            Ok(Mode::Fast)
        } else if s.eq_ignore_ascii_case("advanced") {
            Ok(Mode::Advanced)
        } else {
            Err(ParseSettingError::new("mode", s, Mode::variants_display()))
        }
    }
}

/// Named intensity tier controlling noise and crop strength in advanced mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        }
    }

    pub const fn variants_display() -> &'static str {
        "low, medium, high"
    }

    /// Fixed noise/crop pair for this tier.
    pub const fn values(self) -> IntensityValues {
        match self {
            Intensity::Low => INTENSITY_LOW_VALUES,
            Intensity::Medium => INTENSITY_MEDIUM_VALUES,
            Intensity::High => INTENSITY_HIGH_VALUES,
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("low") {
            Ok(Intensity::Low)
        } else if s.eq_ignore_ascii_case("medium") {
            Ok(Intensity::Medium)
        } else if s.eq_ignore_ascii_case("high") {
            Ok(Intensity::High)
        } else {
            Err(ParseSettingError::new(
                "intensity",
                s,
                Intensity::variants_display(),
            ))
        }
    }
}

/// Noise strength (ffmpeg `noise` filter `alls`) and the fraction of each
/// dimension kept by the center crop before scaling back up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityValues {
    pub noise_strength: u8,
    pub crop_factor: f64,
}

/// Tweak these constants to customize the intensity tiers.
pub const INTENSITY_LOW_VALUES: IntensityValues = IntensityValues {
    noise_strength: 3,
    crop_factor: 0.99,
};

pub const INTENSITY_MEDIUM_VALUES: IntensityValues = IntensityValues {
    noise_strength: 6,
    crop_factor: 0.98,
};

pub const INTENSITY_HIGH_VALUES: IntensityValues = IntensityValues {
    noise_strength: 10,
    crop_factor: 0.96,
};

/// Error returned when parsing a mode or intensity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSettingError {
    setting: &'static str,
    invalid_value: String,
    valid: &'static str,
}

impl ParseSettingError {
    fn new(setting: &'static str, value: &str, valid: &'static str) -> Self {
        Self {
            setting,
            invalid_value: value.to_string(),
            valid,
        }
    }
}

impl fmt::Display for ParseSettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown {} '{}'. Valid options: {}",
            self.setting, self.invalid_value, self.valid
        )
    }
}

impl std::error::Error for ParseSettingError {}

/// Main configuration structure for the rehash-core library.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    // ---- Path Configuration ----
    /// Directory scanned (top level only) for input videos
    pub input_dir: PathBuf,

    /// Directory receiving outputs, ledgers and run logs
    pub output_dir: PathBuf,

    // ---- Transform Settings ----
    pub mode: Mode,

    /// Only consulted in advanced mode
    pub intensity: Intensity,

    /// Re-encode audio with a volume perturbation even in fast mode
    pub scramble_audio: bool,

    // ---- Scheduling ----
    /// Number of concurrent ffmpeg invocations
    pub threads: usize,

    /// Per-job wall-clock limit; `None` waits indefinitely
    pub job_timeout: Option<Duration>,

    // ---- Ledger ----
    /// Also record failed jobs in the failure ledger
    pub log_failures: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mode: Mode::Advanced,
            intensity: Intensity::Medium,
            scramble_audio: false,
            threads: DEFAULT_THREADS,
            job_timeout: None,
            log_failures: true,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration for the given directories with defaults elsewhere.
    pub fn new(input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            ..Self::default()
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(LEDGER_FILENAME)
    }

    pub fn failure_ledger_path(&self) -> PathBuf {
        self.output_dir.join(FAILURE_LEDGER_FILENAME)
    }

    pub fn run_log_dir(&self) -> PathBuf {
        self.output_dir.join(RUN_LOG_DIRNAME)
    }

    /// Validates the worker count (1-64) and a non-zero timeout.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(CoreError::Config(format!(
                "threads must be 1-{MAX_THREADS}, got {}",
                self.threads
            )));
        }

        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::Config(
                "job timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
