//! Ctrl-C handling.
//!
//! The first interrupt sets the shared flag the scheduler polls before each
//! dispatch, so running encodes finish and the summary is still printed. A
//! second interrupt kills the running encodes through the process registry;
//! their partial outputs are removed and the batch winds down as usual. A
//! third exits immediately.

use log::warn;
use rehash_core::ProcessRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status for a run stopped by Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Starts the signal watcher and returns the flag it sets.
///
/// `registry` must be the one the batch's spawner registers children in.
pub fn install_interrupt_handler(registry: Arc<ProcessRegistry>) -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let watcher = Arc::clone(&flag);

    let spawned = std::thread::Builder::new()
        .name("rehash-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Interrupt handling unavailable: {e}");
                    return;
                }
            };

            runtime.block_on(async move {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                watcher.store(true, Ordering::SeqCst);
                warn!("Interrupted: waiting for running jobs, no new files will start (Ctrl-C again to abort)");

                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                let killed = registry.abort();
                warn!("Aborted: stopped {killed} running ffmpeg process(es) (Ctrl-C again to exit now)");

                if tokio::signal::ctrl_c().await.is_ok() {
                    registry.abort();
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            });
        });

    if let Err(e) = spawned {
        warn!("Failed to start interrupt watcher: {e}");
    }

    flag
}
