//! ftx: transactional flat-file access from the command line.
//!
//! This is the main entry point for the `ftx` CLI. It parses arguments,
//! builds the shared file access context, installs the interrupt handler,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;

use cli::Cli;
use ftx::{exit_codes, logging, shutdown};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    let result = commands::build_access(&cli).and_then(|access| {
        let access = Arc::new(access);
        shutdown::install_interrupt_handler(access.clone())?;
        commands::dispatch(cli.command, &access)
    });

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
