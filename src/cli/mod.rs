//! CLI argument parsing for ftx.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ftx::OpenMode;
use std::path::PathBuf;

/// ftx: read, create and update flat files shared between processes.
///
/// Writers take a sibling lock file (`.NAME.lock`); updates go through a
/// staging file (`.NAME.temp`) that replaces the original on commit.
#[derive(Parser, Debug)]
#[command(name = "ftx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file (wait timeout, retry interval, replace mode).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the lock wait timeout, in seconds.
    #[arg(long, global = true)]
    pub wait_timeout: Option<f64>,

    /// Override the interval between lock attempts, in milliseconds.
    #[arg(long, global = true)]
    pub retry_interval: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv). `FTX_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for ftx.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a file once no writer holds it.
    Cat(CatArgs),

    /// Create a new file from stdin (or --input) and commit it.
    Create(CreateArgs),

    /// Replace (or append to) a file's content atomically.
    Update(UpdateArgs),

    /// Hold a file open for a while, then commit or abort.
    ///
    /// Useful in scripts and for observing lock behavior from another
    /// terminal.
    Hold(HoldArgs),

    /// Lock management commands.
    ///
    /// List or clear lock files left on disk.
    Lock(LockCommand),
}

/// Arguments for the `cat` command.
#[derive(Parser, Debug)]
pub struct CatArgs {
    /// File to print.
    pub path: PathBuf,
}

/// Arguments for the `create` command.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// File to create. Must not exist.
    pub path: PathBuf,

    /// Read content from this file instead of stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

/// Arguments for the `update` command.
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// File to update. Must exist.
    pub path: PathBuf,

    /// Read content from this file instead of stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Keep the current content and append the input to it.
    #[arg(long)]
    pub append: bool,
}

/// Access mode accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Read,
    Create,
    Update,
}

impl From<ModeArg> for OpenMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Read => OpenMode::Read,
            ModeArg::Create => OpenMode::Create,
            ModeArg::Update => OpenMode::Update,
        }
    }
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// File to hold.
    pub path: PathBuf,

    /// Access mode.
    #[arg(long, value_enum, default_value = "update")]
    pub mode: ModeArg,

    /// How long to hold the file, in seconds.
    #[arg(long, default_value_t = 5.0)]
    pub seconds: f64,

    /// Commit when the time is up instead of aborting.
    #[arg(long)]
    pub commit: bool,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List lock files in a directory.
    ///
    /// Shows each lock with its owner, age and whether it is stale.
    List(LockListArgs),

    /// Clear the lock on a file.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock list` command.
#[derive(Parser, Debug)]
pub struct LockListArgs {
    /// Directory to scan (default: current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// File whose lock should be cleared (not the lock file itself).
    pub path: PathBuf,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
