//! Command implementations for ftx.
//!
//! This module builds the `FileAccess` the whole run shares and routes CLI
//! commands to their implementations.

mod file;
mod lock;

#[cfg(test)]
mod tests;

use crate::cli::{Cli, Command, LockAction, LockCommand};
use ftx::config::Config;
use ftx::context::FileAccess;
use ftx::error::Result;

/// Resolve the effective config: file (if given), then flag overrides.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(secs) = cli.wait_timeout {
        config.wait_timeout_secs = secs;
    }
    if let Some(ms) = cli.retry_interval {
        config.retry_interval_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

/// Build the file access context for this run.
pub fn build_access(cli: &Cli) -> Result<FileAccess> {
    FileAccess::new(resolve_config(cli)?)
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command, access: &FileAccess) -> Result<()> {
    match command {
        Command::Cat(args) => file::cmd_cat(access, args),
        Command::Create(args) => file::cmd_create(access, args),
        Command::Update(args) => file::cmd_update(access, args),
        Command::Hold(args) => file::cmd_hold(access, args),
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd, access.config()),
    }
}

/// Dispatch lock subcommands.
fn dispatch_lock(lock_cmd: LockCommand, config: &Config) -> Result<()> {
    match lock_cmd.action {
        LockAction::List(args) => lock::cmd_lock_list(args, config),
        LockAction::Clear(args) => lock::cmd_lock_clear(args, config),
    }
}
