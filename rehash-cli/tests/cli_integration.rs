// rehash-cli/tests/cli_integration.rs
//
// Drives the compiled `rehash` binary against a shell script standing in for
// ffmpeg, so these tests only run on Unix.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::{TempDir, tempdir};

/// Copies the input to the last argument and appends a unique marker. Inputs
/// whose name contains CORRUPT fail the way ffmpeg does on bad media. LATE
/// inputs touch `started` next to the script, then write their output after
/// four seconds.
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
  *LATE*) touch "$(dirname "$0")/started"; sleep 4 >/dev/null 2>&1 ;;
esac
cat "$in" > "$out" || exit 1
echo "$$-$(date +%s%N)" >> "$out"
"#;

struct Workspace {
    root: TempDir,
    ffmpeg: PathBuf,
}

impl Workspace {
    fn new() -> Result<Self, Box<dyn Error>> {
        let root = tempdir()?;
        let ffmpeg = root.path().join("ffmpeg");
        fs::write(&ffmpeg, FAKE_FFMPEG)?;
        fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755))?;
        Ok(Self { root, ffmpeg })
    }

    fn input(&self) -> PathBuf {
        self.root.path().join("input")
    }

    fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    fn add_input(&self, name: &str, bytes: usize) -> Result<PathBuf, Box<dyn Error>> {
        fs::create_dir_all(self.input())?;
        let path = self.input().join(name);
        fs::write(&path, vec![0x42u8; bytes])?;
        Ok(path)
    }

    fn rehash(&self) -> Command {
        self.rehash_using(&self.ffmpeg)
    }

    fn rehash_using(&self, ffmpeg: &Path) -> Command {
        let mut cmd = Command::cargo_bin("rehash").expect("Failed to find rehash binary");
        cmd.env("NO_COLOR", "1")
            .env_remove("REHASH_FFMPEG")
            .arg("--input")
            .arg(self.input())
            .arg("--output")
            .arg(self.output())
            .arg("--ffmpeg")
            .arg(ffmpeg);
        cmd
    }

    fn outputs(&self) -> Result<Vec<PathBuf>, Box<dyn Error>> {
        let mut videos = Vec::new();
        for entry in fs::read_dir(self.output())? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "mp4") {
                videos.push(path);
            }
        }
        Ok(videos)
    }

    fn ledger(&self) -> Result<Vec<String>, Box<dyn Error>> {
        read_lines(&self.output().join("processed_log.csv"))
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(fs::read_to_string(path)?.lines().map(str::to_string).collect())
}

fn send_sigint(pid: u32) -> Result<(), Box<dyn Error>> {
    let status = std::process::Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()?;
    assert!(status.success(), "kill -INT {pid} failed");
    Ok(())
}

fn wait_with_timeout(
    child: &mut std::process::Child,
    limit: Duration,
) -> Result<ExitStatus, Box<dyn Error>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            child.kill()?;
            return Err(format!("rehash still running after {limit:?}").into());
        }
        sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_fast_mode_transforms_only_videos() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 500 * 1024)?;
    let notes = ws.add_input("notes.txt", 64)?;

    ws.rehash()
        .args(["--mode", "fast"])
        .assert()
        .success()
        .stdout(contains("[1/1] ✓ clip1.mp4 -> "))
        .stdout(contains("1 of 1 succeeded, 0 failed"))
        .stdout(contains("notes.txt").not());

    let outputs = ws.outputs()?;
    assert_eq!(outputs.len(), 1);
    let stem = outputs[0].file_stem().unwrap().to_string_lossy().into_owned();
    assert_eq!(stem.len(), 12);
    assert!(stem.chars().all(|c| c.is_ascii_alphanumeric()));

    let ledger = ws.ledger()?;
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0], "timestamp,original_name,new_name,md5,mode");
    assert!(ledger[1].contains(&format!(",clip1.mp4,{stem}.mp4,")));
    assert!(ledger[1].ends_with(",fast"));

    assert_eq!(fs::read(&notes)?, vec![0x42u8; 64]);
    Ok(())
}

#[test]
fn test_corrupt_file_does_not_stop_batch() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    for name in ["a.mp4", "b.mp4", "CORRUPT.mp4", "d.mp4", "e.mp4"] {
        ws.add_input(name, 4096)?;
    }

    ws.rehash()
        .args(["--threads", "2"])
        .assert()
        .success()
        .stdout(contains("✗ CORRUPT.mp4: Encoding failed (exit code 1)"))
        .stdout(contains("4 of 5 succeeded, 1 failed"));

    assert_eq!(ws.outputs()?.len(), 4);
    assert_eq!(ws.ledger()?.len(), 5);

    let failures = read_lines(&ws.output().join("failed_log.csv"))?;
    assert_eq!(failures.len(), 2);
    assert!(failures[1].contains(",CORRUPT.mp4,"));
    Ok(())
}

#[test]
fn test_missing_input_dir_is_created() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;

    ws.rehash()
        .assert()
        .success()
        .stdout(contains("Created input directory"));

    assert!(ws.input().is_dir());
    assert!(!ws.output().exists());
    Ok(())
}

#[test]
fn test_empty_input_dir_is_not_an_error() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("readme.txt", 10)?;

    ws.rehash()
        .assert()
        .success()
        .stdout(contains("No supported video files"));
    Ok(())
}

#[test]
fn test_invalid_ffmpeg_path_is_fatal() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 1024)?;

    ws.rehash_using(&ws.root.path().join("missing-ffmpeg"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("ffmpeg not usable"));

    assert!(!ws.output().join("processed_log.csv").exists());
    Ok(())
}

#[test]
fn test_startup_failure_is_logged_to_stderr() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 1024)?;

    ws.rehash_using(&ws.root.path().join("missing-ffmpeg"))
        .assert()
        .code(1)
        .stderr(contains("[ERROR] Fatal: Invalid ffmpeg executable"));
    Ok(())
}

#[test]
fn test_second_interrupt_kills_running_encodes() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("LATE.mp4", 4096)?;
    let started = ws.root.path().join("started");

    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_rehash"))
        .env("NO_COLOR", "1")
        .env_remove("REHASH_FFMPEG")
        .arg("--input")
        .arg(ws.input())
        .arg("--output")
        .arg(ws.output())
        .arg("--ffmpeg")
        .arg(&ws.ffmpeg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while !started.exists() {
        if Instant::now() >= deadline {
            child.kill()?;
            return Err("ffmpeg was never started".into());
        }
        sleep(Duration::from_millis(20));
    }

    send_sigint(child.id())?;
    sleep(Duration::from_millis(300));
    send_sigint(child.id())?;

    let status = wait_with_timeout(&mut child, Duration::from_secs(10))?;
    assert_eq!(status.code(), Some(130));

    // Past the point where an orphaned encoder would have written its output
    sleep(Duration::from_secs(5));
    assert!(ws.outputs()?.is_empty());
    assert_eq!(ws.ledger()?.len(), 1, "only the header");

    let failures = read_lines(&ws.output().join("failed_log.csv"))?;
    assert_eq!(failures.len(), 2);
    assert!(failures[1].contains(",LATE.mp4,Aborted before completion,"));
    Ok(())
}

#[test]
fn test_reruns_append_to_ledger() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 2048)?;

    ws.rehash().assert().success();
    ws.rehash().assert().success();

    let ledger = ws.ledger()?;
    assert_eq!(ledger.len(), 3);
    assert_eq!(
        ledger.iter().filter(|l| l.starts_with("timestamp,")).count(),
        1
    );

    let names: HashSet<_> = ws.outputs()?.into_iter().collect();
    assert_eq!(names.len(), 2);

    let hashes: HashSet<String> = ledger[1..]
        .iter()
        .map(|row| row.split(',').nth(3).unwrap().to_string())
        .collect();
    assert_eq!(hashes.len(), 2);
    Ok(())
}

#[test]
fn test_run_log_written_unless_disabled() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 1024)?;

    ws.rehash().arg("--no-log").assert().success();
    assert!(!ws.output().join("logs").exists());

    ws.rehash().assert().success();
    let logs: Vec<_> = fs::read_dir(ws.output().join("logs"))?
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("rehash_run_") && logs[0].ends_with(".log"));

    let content = fs::read_to_string(ws.output().join("logs").join(&logs[0]))?;
    assert!(content.contains("clip1.mp4"));
    Ok(())
}

#[test]
fn test_json_output() -> Result<(), Box<dyn Error>> {
    let ws = Workspace::new()?;
    ws.add_input("clip1.mp4", 1024)?;
    ws.add_input("CORRUPT.mkv", 1024)?;

    let output = ws.rehash().arg("--json").output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.iter().all(|l| l.starts_with('{') && l.ends_with('}')));
    assert!(lines[0].contains("\"type\":\"batch_started\""));
    assert_eq!(
        lines
            .iter()
            .filter(|l| l.contains("\"type\":\"job_finished\""))
            .count(),
        2
    );
    assert!(stdout.contains("\"status\":\"success\""));
    assert!(stdout.contains("\"status\":\"error\""));
    assert!(lines.last().unwrap().contains("\"type\":\"batch_complete\""));
    Ok(())
}

#[test]
fn test_rejects_bad_thread_count() {
    let ws = Workspace::new().unwrap();

    ws.rehash()
        .args(["--threads", "0"])
        .assert()
        .failure()
        .stderr(contains("between 1 and 64"));
}
