// rehash-core/tests/pipeline_tests.rs
//
// End-to-end batch runs through the real process spawner, with a shell script
// standing in for ffmpeg.

#![cfg(unix)]

use rehash_core::config::{CoreConfig, Mode};
use rehash_core::processing::BatchSettings;
use rehash_core::{
    JobFailure, Ledger, LogRecord, SidecarSpawner, enumerate_jobs, file_md5, run_batch,
};
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// Copies the input to the last argument and appends a unique marker.
/// Inputs whose name contains CORRUPT fail like ffmpeg does on bad media;
/// inputs containing SLOW sleep long enough to hit a timeout. LATE inputs
/// write their output only after two seconds.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
in=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then in="$arg"; fi
  prev="$arg"
  out="$arg"
done
case "$in" in
  *CORRUPT*) echo "$in: Invalid data found when processing input" >&2; exit 1 ;;
  *SLOW*) exec sleep 30 ;;
  *LATE*) sleep 2 >/dev/null 2>&1 ;;
esac
cat "$in" > "$out" || exit 1
echo "$$-$(date +%s%N)" >> "$out"
"#;

fn install_fake_ffmpeg(dir: &Path) -> PathBuf {
    let path = dir.join("ffmpeg");
    fs::write(&path, FAKE_FFMPEG).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn output_videos(config: &CoreConfig) -> Vec<PathBuf> {
    fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "mp4"))
        .collect()
}

fn setup(root: &Path, files: &[&str]) -> CoreConfig {
    let input = root.join("input");
    fs::create_dir_all(&input).unwrap();
    for (i, name) in files.iter().enumerate() {
        fs::write(input.join(name), vec![i as u8; 2048]).unwrap();
    }
    let mut config = CoreConfig::new(input, root.join("output"));
    config.mode = Mode::Fast;
    config
}

#[test]
fn batch_isolates_failures_and_changes_hashes() {
    let dir = tempdir().unwrap();
    let ffmpeg = install_fake_ffmpeg(dir.path());
    let mut config = setup(
        dir.path(),
        &["a.mp4", "b.mp4", "CORRUPT.mp4", "d.mp4", "e.mp4"],
    );
    config.threads = 2;

    let jobs = enumerate_jobs(&config).unwrap();
    let settings = BatchSettings::from_config(&config, ffmpeg);
    let mut ledger = Ledger::open(&config.ledger_path()).unwrap();

    let mut reported = Vec::new();
    let summary = run_batch(
        &SidecarSpawner::new(),
        &jobs,
        &settings,
        &AtomicBool::new(false),
        |result, index, total| {
            assert_eq!(total, 5);
            if let Some(record) = LogRecord::from_result(result) {
                ledger.append(&record).unwrap();
            }
            reported.push((index, result.clone()));
        },
    )
    .unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(reported.len(), 5);
    assert_eq!(ledger.rows_written(), 4);

    for (_, result) in &reported {
        match result.success() {
            Some(success) => {
                assert_ne!(
                    success.content_hash,
                    file_md5(&result.source_path).unwrap(),
                    "output of {} kept the source hash",
                    result.original_name
                );
                assert!(success.output_path.exists());
            }
            None => {
                assert_eq!(result.original_name, "CORRUPT.mp4");
                assert!(matches!(
                    result.failure(),
                    Some(JobFailure::Encoding { exit_code: Some(1), detail })
                        if detail.contains("Invalid data found")
                ));
            }
        }
    }

    assert_eq!(output_videos(&config).len(), 4);

    let content = fs::read_to_string(config.ledger_path()).unwrap();
    assert_eq!(content.lines().count(), 5);
    assert!(!content.contains("CORRUPT.mp4"));
}

#[test]
fn repeated_runs_produce_distinct_outputs() {
    let dir = tempdir().unwrap();
    let ffmpeg = install_fake_ffmpeg(dir.path());
    let config = setup(dir.path(), &["clip1.mp4"]);
    let settings = BatchSettings::from_config(&config, ffmpeg);

    let mut names = HashSet::new();
    let mut hashes = HashSet::new();
    for _ in 0..2 {
        let jobs = enumerate_jobs(&config).unwrap();
        run_batch(
            &SidecarSpawner::new(),
            &jobs,
            &settings,
            &AtomicBool::new(false),
            |result, _, _| {
                let success = result.success().unwrap();
                names.insert(success.new_name.clone());
                hashes.insert(success.content_hash.clone());
            },
        )
        .unwrap();
    }

    assert_eq!(names.len(), 2);
    assert_eq!(hashes.len(), 2);
}

#[test]
fn hung_encoder_is_killed_after_timeout() {
    let dir = tempdir().unwrap();
    let ffmpeg = install_fake_ffmpeg(dir.path());
    let mut config = setup(dir.path(), &["SLOW.mp4", "fine.mp4"]);
    config.job_timeout = Some(Duration::from_millis(300));

    let jobs = enumerate_jobs(&config).unwrap();
    let settings = BatchSettings::from_config(&config, ffmpeg);

    let mut failures = Vec::new();
    let summary = run_batch(
        &SidecarSpawner::new(),
        &jobs,
        &settings,
        &AtomicBool::new(false),
        |result, _, _| {
            if let Some(failure) = result.failure() {
                failures.push((result.original_name.clone(), failure.clone()));
            }
        },
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        failures,
        vec![(
            "SLOW.mp4".to_string(),
            JobFailure::Timeout(Duration::from_millis(300))
        )]
    );
    assert!(summary.elapsed < Duration::from_secs(20));
}

// Linux file systems accept any bytes in a name; others may refuse to create it.
#[cfg(target_os = "linux")]
#[test]
fn source_name_with_invalid_utf8_is_transformed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let ffmpeg = install_fake_ffmpeg(dir.path());
    let config = setup(dir.path(), &[]);
    let source = config.input_dir.join(OsStr::from_bytes(b"clip\xff.mp4"));
    fs::write(&source, vec![9u8; 4096]).unwrap();

    let jobs = enumerate_jobs(&config).unwrap();
    assert_eq!(jobs.len(), 1);
    let settings = BatchSettings::from_config(&config, ffmpeg);
    let mut ledger = Ledger::open(&config.ledger_path()).unwrap();

    let mut results = Vec::new();
    let summary = run_batch(
        &SidecarSpawner::new(),
        &jobs,
        &settings,
        &AtomicBool::new(false),
        |result, _, _| {
            if let Some(record) = LogRecord::from_result(result) {
                ledger.append(&record).unwrap();
            }
            results.push(result.clone());
        },
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1, "outcome: {:?}", results[0].outcome);
    let success = results[0].success().unwrap();
    assert_ne!(success.content_hash, file_md5(&source).unwrap());
    assert_eq!(output_videos(&config), vec![success.output_path.clone()]);
    assert_eq!(fs::read_to_string(config.ledger_path()).unwrap().lines().count(), 2);
}

#[test]
fn abort_kills_running_encoders_and_leaves_no_output() {
    let dir = tempdir().unwrap();
    let ffmpeg = install_fake_ffmpeg(dir.path());
    let mut config = setup(dir.path(), &["LATE1.mp4", "LATE2.mp4", "fine.mp4"]);
    config.threads = 2;

    let jobs = enumerate_jobs(&config).unwrap();
    let settings = BatchSettings::from_config(&config, ffmpeg);
    let spawner = SidecarSpawner::new();
    let cancel = AtomicBool::new(false);

    let mut failures = Vec::new();
    let summary = std::thread::scope(|s| {
        s.spawn(|| {
            let deadline = Instant::now() + Duration::from_secs(10);
            while spawner.registry().running() < 2 && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(20));
            }
            cancel.store(true, Ordering::SeqCst);
            spawner.registry().abort();
        });

        run_batch(&spawner, &jobs, &settings, &cancel, |result, _, _| {
            failures.extend(result.failure().cloned());
        })
        .unwrap()
    });

    assert!(summary.interrupted);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(failures, vec![JobFailure::Aborted, JobFailure::Aborted]);
    assert_eq!(spawner.registry().running(), 0);

    // Past the point where the encoders would have written their output
    std::thread::sleep(Duration::from_secs(3));
    assert!(output_videos(&config).is_empty());
}
