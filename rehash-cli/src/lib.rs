// rehash-cli/src/lib.rs
//
// Library portion of the Rehash CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod interrupt;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, RunArgs, parse_cli};
pub use commands::run::{RunOutcome, run};
pub use error::CliResult;
