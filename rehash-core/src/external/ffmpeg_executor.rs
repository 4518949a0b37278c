// ============================================================================
// rehash-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and waiting on FFmpeg
// processes. The worker only needs to know whether a process succeeded, its
// exit code, the last lines of its stderr, or that it overran its time limit.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - ProcessRegistry: the live children of a run, so an abort can kill them
//
// A timed-out process is killed and reaped before `wait_for_exit` returns.
// On Unix each process gets its own process group, so a terminal interrupt
// only reaches rehash itself and running encodes drain normally. Stopping
// them early goes through `ProcessRegistry::abort`.

use crate::error::{CoreResult, command_start_error, command_wait_error};

use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Number of trailing stderr lines kept for failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// How often a wait checks whether the process has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Final state of a finished ffmpeg process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Last lines ffmpeg wrote to stderr.
    pub stderr_tail: String,
}

/// Result of waiting on an ffmpeg process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    Finished(ExitReport),
    /// The time limit passed; the process has been killed.
    TimedOut,
    /// The run was aborted and the process was killed before it finished.
    Aborted,
}

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Blocks until the process exits, `timeout` elapses or the run is aborted.
    fn wait_for_exit(&mut self, timeout: Option<Duration>) -> CoreResult<ProcessExit>;
}

/// Trait representing something that can spawn an FfmpegProcess.
///
/// Spawners are shared by every worker thread of a batch.
pub trait FfmpegSpawner: Send + Sync {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

type SharedChild = Arc<Mutex<SidecarChild>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn kill_child(child: &SharedChild) {
    if let Err(e) = lock(child).as_inner_mut().kill() {
        debug!("Failed to kill ffmpeg process: {}", e);
    }
}

/// Every ffmpeg child spawned through a `SidecarSpawner` that has not been
/// waited on yet.
///
/// `abort` kills all of them, and any child registered after an abort is
/// killed as soon as it is registered.
#[derive(Default)]
pub struct ProcessRegistry {
    children: Mutex<HashMap<u64, SharedChild>>,
    next_id: AtomicU64,
    aborted: AtomicBool,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Kills every running child and returns how many there were.
    pub fn abort(&self) -> usize {
        self.aborted.store(true, Ordering::SeqCst);
        let children: Vec<SharedChild> = lock(&self.children).values().cloned().collect();
        for child in &children {
            kill_child(child);
        }
        children.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Number of children not yet waited on.
    pub fn running(&self) -> usize {
        lock(&self.children).len()
    }

    fn register(&self, child: &SharedChild) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.children).insert(id, Arc::clone(child));
        if self.is_aborted() {
            kill_child(child);
        }
        id
    }

    fn unregister(&self, id: u64) {
        lock(&self.children).remove(&id);
    }
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess {
    id: u64,
    child: SharedChild,
    registry: Arc<ProcessRegistry>,
    stderr_reader: Option<JoinHandle<String>>,
}

impl SidecarProcess {
    fn new(mut child: SidecarChild, registry: Arc<ProcessRegistry>) -> Self {
        let stderr_reader = child.as_inner_mut().stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!("ffmpeg: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });

        let child = Arc::new(Mutex::new(child));
        let id = registry.register(&child);

        Self {
            id,
            child,
            registry,
            stderr_reader,
        }
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr_reader
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    fn kill_and_reap(&mut self) {
        let mut child = lock(&self.child);
        let inner = child.as_inner_mut();
        if let Err(e) = inner.kill() {
            warn!("Failed to kill timed-out ffmpeg process: {}", e);
        }
        if let Err(e) = inner.wait() {
            warn!("Failed to reap killed ffmpeg process: {}", e);
        }
    }
}

impl Drop for SidecarProcess {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl FfmpegProcess for SidecarProcess {
    fn wait_for_exit(&mut self, timeout: Option<Duration>) -> CoreResult<ProcessExit> {
        let deadline = timeout.map(|limit| Instant::now() + limit);

        // Never block in wait(): abort needs the child lock to kill it.
        let status = loop {
            let polled = lock(&self.child).as_inner_mut().try_wait();
            match polled {
                Ok(Some(status)) => break status,
                Ok(None) if deadline.is_some_and(|at| Instant::now() >= at) => {
                    warn!("ffmpeg exceeded {:?}; killing process", timeout.unwrap_or_default());
                    self.kill_and_reap();
                    self.registry.unregister(self.id);
                    self.collect_stderr();
                    return Ok(ProcessExit::TimedOut);
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(command_wait_error("ffmpeg", e)),
            }
        };
        self.registry.unregister(self.id);
        let stderr_tail = self.collect_stderr();

        if !status.success() && self.registry.is_aborted() {
            debug!("ffmpeg stopped by abort ({})", status);
            return Ok(ProcessExit::Aborted);
        }

        Ok(ProcessExit::Finished(ExitReport {
            success: status.success(),
            code: status.code(),
            stderr_tail,
        }))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
///
/// Clones share one `ProcessRegistry`.
#[derive(Clone, Default)]
pub struct SidecarSpawner {
    registry: Arc<ProcessRegistry>,
}

impl SidecarSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_registry(registry: Arc<ProcessRegistry>) -> Self {
        Self { registry }
    }

    /// Registry holding the children this spawner started.
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }
}

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        // Own process group: a terminal Ctrl-C must not reach running encodes.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_inner_mut().process_group(0);
        }
        let registry = Arc::clone(&self.registry);
        cmd.spawn()
            .map(|child| SidecarProcess::new(child, registry))
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}
