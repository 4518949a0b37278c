// rehash-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for this crate's unit tests and for the "test-mocks" feature.

use super::ffmpeg_builder::command_os_args;
use super::{ExitReport, FfmpegProcess, FfmpegSpawner, ProcessExit};
use crate::error::{CoreError, CoreResult, command_start_error};

use ffmpeg_sidecar::command::FfmpegCommand;
use rand::Rng;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What a mocked ffmpeg invocation does.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Exit 0 after writing the input bytes plus a random suffix to the output.
    Succeed,
    /// Exit with `exit_code`; optionally leave a truncated output behind.
    Fail {
        exit_code: i32,
        stderr: String,
        partial_output: bool,
    },
    /// Never exit; reports a timeout once the caller's limit has passed.
    Hang,
    /// Killed by a run abort partway through, leaving a truncated output.
    Aborted,
    /// The process cannot be started at all.
    SpawnError,
}

#[derive(Default)]
struct MockState {
    rules: Mutex<Vec<(String, MockBehavior)>>,
    calls: Mutex<Vec<Vec<OsString>>>,
    delay: Mutex<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock implementation of FfmpegSpawner shared across worker threads.
///
/// Rules are matched in insertion order against every argument; the first
/// rule whose pattern is a substring of any argument decides the behavior.
/// Unmatched invocations succeed. Arguments are kept as `OsString`, so paths
/// that are not valid UTF-8 are read and written as given.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    state: Arc<MockState>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_rule(&self, arg_pattern: &str, behavior: MockBehavior) {
        lock(&self.state.rules).push((arg_pattern.to_string(), behavior));
    }

    pub fn fail_when(&self, arg_pattern: &str, exit_code: i32) {
        self.add_rule(
            arg_pattern,
            MockBehavior::Fail {
                exit_code,
                stderr: format!("{arg_pattern}: Invalid data found when processing input"),
                partial_output: false,
            },
        );
    }

    pub fn hang_when(&self, arg_pattern: &str) {
        self.add_rule(arg_pattern, MockBehavior::Hang);
    }

    /// Simulated encode time of every invocation.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.state.delay) = delay;
    }

    /// Arguments of every spawn so far, lossily converted for assertions.
    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        lock(&self.state.calls)
            .iter()
            .map(|args| args.iter().map(|a| a.to_string_lossy().into_owned()).collect())
            .collect()
    }

    /// Arguments of every spawn so far, exactly as passed.
    pub fn get_received_os_calls(&self) -> Vec<Vec<OsString>> {
        lock(&self.state.calls).clone()
    }

    /// Highest number of processes that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, args: &[OsString]) -> MockBehavior {
        lock(&self.state.rules)
            .iter()
            .find(|(pattern, _)| {
                args.iter()
                    .any(|arg| arg.to_string_lossy().contains(pattern.as_str()))
            })
            .map(|(_, behavior)| behavior.clone())
            .unwrap_or(MockBehavior::Succeed)
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args = command_os_args(&cmd);
        lock(&self.state.calls).push(args.clone());

        let behavior = self.behavior_for(&args);
        if matches!(behavior, MockBehavior::SpawnError) {
            log::warn!("MockFfmpegSpawner simulating spawn error for {:?}", args);
            return Err(command_start_error(
                "ffmpeg (mock)",
                io::Error::new(io::ErrorKind::PermissionDenied, "mock spawn failure"),
            ));
        }

        let now_active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(now_active, Ordering::SeqCst);

        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from);
        let output = args.last().map(PathBuf::from);

        Ok(MockFfmpegProcess {
            behavior,
            input,
            output,
            delay: *lock(&self.state.delay),
            state: Arc::clone(&self.state),
            finished: false,
        })
    }
}

/// Mock implementation of FfmpegProcess.
pub struct MockFfmpegProcess {
    behavior: MockBehavior,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    delay: Duration,
    state: Arc<MockState>,
    finished: bool,
}

impl MockFfmpegProcess {
    fn write_output(&self, truncated: bool) {
        let Some(output) = &self.output else {
            log::warn!("MockFfmpegProcess couldn't find output path in args");
            return;
        };
        let mut bytes = self
            .input
            .as_ref()
            .and_then(|input| std::fs::read(input).ok())
            .unwrap_or_default();
        if truncated {
            bytes.truncate(bytes.len() / 2);
        } else {
            let mut suffix = [0u8; 16];
            rand::thread_rng().fill(&mut suffix[..]);
            bytes.extend_from_slice(&suffix);
        }
        if let Err(e) = std::fs::write(output, bytes) {
            log::error!("MockFfmpegProcess failed to write {:?}: {}", output, e);
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.state.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockFfmpegProcess {
    fn drop(&mut self) {
        self.finish();
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn wait_for_exit(&mut self, timeout: Option<Duration>) -> CoreResult<ProcessExit> {
        let result = match self.behavior.clone() {
            MockBehavior::Hang => match timeout {
                Some(limit) => {
                    std::thread::sleep(limit);
                    Ok(ProcessExit::TimedOut)
                }
                None => Err(CoreError::OperationFailed(
                    "mock ffmpeg hangs and no timeout was given".to_string(),
                )),
            },
            MockBehavior::Succeed => {
                std::thread::sleep(self.delay);
                self.write_output(false);
                Ok(ProcessExit::Finished(ExitReport {
                    success: true,
                    code: Some(0),
                    stderr_tail: String::new(),
                }))
            }
            MockBehavior::Fail {
                exit_code,
                stderr,
                partial_output,
            } => {
                std::thread::sleep(self.delay);
                if partial_output {
                    self.write_output(true);
                }
                Ok(ProcessExit::Finished(ExitReport {
                    success: false,
                    code: Some(exit_code),
                    stderr_tail: stderr,
                }))
            }
            MockBehavior::Aborted => {
                std::thread::sleep(self.delay);
                self.write_output(true);
                Ok(ProcessExit::Aborted)
            }
            MockBehavior::SpawnError => Err(CoreError::OperationFailed(
                "spawn error behavior reached wait".to_string(),
            )),
        };
        self.finish();
        result
    }
}
