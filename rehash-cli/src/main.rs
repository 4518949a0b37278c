// rehash-cli/src/main.rs
//
// Entry point for the `rehash` binary.
//
// Parses arguments, installs the stderr logger, starts the Ctrl-C watcher and
// hands over to the batch run. Exit status: 0 when the run finished (per-file
// failures included), 1 on a fatal startup error, 130 when an interrupt
// stopped the batch early.

use rehash_cli::interrupt::{INTERRUPTED_EXIT_CODE, install_interrupt_handler};
use rehash_cli::logging::init_console_logging;
use rehash_cli::{RunOutcome, parse_cli, run};
use rehash_core::SidecarSpawner;
use std::process;
use std::sync::Arc;

fn main() {
    let cli = parse_cli();

    let logging = match init_console_logging(cli.run.verbose) {
        Ok(logging) => Some(logging),
        Err(e) => {
            eprintln!("Warning: logging unavailable: {e}");
            None
        }
    };

    let spawner = SidecarSpawner::new();
    let cancel = install_interrupt_handler(Arc::clone(spawner.registry()));

    match run(cli.run, &spawner, logging.as_ref(), &cancel) {
        Ok(RunOutcome::Completed(summary)) if summary.interrupted => {
            process::exit(INTERRUPTED_EXIT_CODE);
        }
        Ok(_) => {}
        // Already reported by the run
        Err(_) => process::exit(1),
    }
}
