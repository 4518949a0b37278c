// rehash-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::Parser;
use rehash_core::config::{
    DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_THREADS, Intensity, MAX_THREADS, Mode,
};
use std::path::PathBuf;
use std::time::Duration;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    name = "rehash",
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Rehash: batch video re-encoding with fresh content hashes",
    long_about = "Re-encodes every video in an input directory through ffmpeg with a \
                  lightly randomized filter chain, writing each result under a random \
                  name and recording it in a CSV ledger."
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Directory scanned for input videos (created if missing)
    #[arg(short = 'i', long = "input", value_name = "DIR", default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    /// Directory receiving transformed videos, ledgers and run logs
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Explicit path to the ffmpeg executable
    #[arg(short = 'f', long = "ffmpeg", value_name = "PATH", env = "REHASH_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Transform mode
    #[arg(short = 'm', long, value_name = "MODE", default_value = "advanced", value_parser = parse_mode)]
    pub mode: Mode,

    /// Noise and crop strength (advanced mode only)
    #[arg(long, value_name = "LEVEL", default_value = "medium", value_parser = parse_intensity)]
    pub intensity: Intensity,

    /// Number of concurrent ffmpeg processes
    #[arg(
        short = 't',
        long,
        value_name = "N",
        default_value_t = DEFAULT_THREADS,
        value_parser = parse_threads
    )]
    pub threads: usize,

    /// Re-encode audio with a small volume change instead of copying it
    #[arg(long)]
    pub scramble_audio: bool,

    /// Kill an ffmpeg process that runs longer than this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Emit one JSON object per event instead of human-readable output
    #[arg(long)]
    pub json: bool,

    /// Do not write a run log under OUTPUT/logs
    #[arg(long)]
    pub no_log: bool,

    /// Do not record failed files in the failure ledger
    #[arg(long)]
    pub no_failure_log: bool,

    /// Show debug diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn job_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

fn parse_intensity(s: &str) -> Result<Intensity, String> {
    s.parse::<Intensity>().map_err(|e| e.to_string())
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let threads: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a whole number"))?;
    if (1..=MAX_THREADS).contains(&threads) {
        Ok(threads)
    } else {
        Err(format!("must be between 1 and {MAX_THREADS}"))
    }
}

/// Parses the process arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["rehash"]);
        let args = cli.run;

        assert_eq!(args.input_dir, PathBuf::from("input"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert_eq!(args.mode, Mode::Advanced);
        assert_eq!(args.intensity, Intensity::Medium);
        assert_eq!(args.threads, 3);
        assert!(!args.scramble_audio);
        assert!(args.job_timeout().is_none());
        assert!(!args.json);
        assert!(!args.no_log);
        assert!(!args.no_failure_log);
        assert!(!args.verbose);
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::parse_from([
            "rehash",
            "-i",
            "clips",
            "--output",
            "out",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "-m",
            "FAST",
            "--intensity",
            "high",
            "-t",
            "8",
            "--scramble-audio",
            "--timeout",
            "90",
            "--json",
            "--no-log",
            "--no-failure-log",
            "-v",
        ]);
        let args = cli.run;

        assert_eq!(args.input_dir, PathBuf::from("clips"));
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.ffmpeg, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(args.mode, Mode::Fast);
        assert_eq!(args.intensity, Intensity::High);
        assert_eq!(args.threads, 8);
        assert!(args.scramble_audio);
        assert_eq!(args.job_timeout(), Some(Duration::from_secs(90)));
        assert!(args.json && args.no_log && args.no_failure_log && args.verbose);
    }

    #[test]
    fn test_rejects_out_of_range_threads() {
        assert!(Cli::try_parse_from(["rehash", "--threads", "0"]).is_err());
        assert!(Cli::try_parse_from(["rehash", "--threads", "65"]).is_err());
        assert!(Cli::try_parse_from(["rehash", "--threads", "many"]).is_err());
        assert!(Cli::try_parse_from(["rehash", "--threads", "64"]).is_ok());
    }

    #[test]
    fn test_rejects_unknown_mode_and_intensity() {
        let err = Cli::try_parse_from(["rehash", "--mode", "turbo"]).unwrap_err();
        assert!(err.to_string().contains("Valid options: fast, advanced"));

        assert!(Cli::try_parse_from(["rehash", "--intensity", "extreme"]).is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["rehash", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
