//! `lock list` and `lock clear`.

use crate::cli::{LockClearArgs, LockListArgs};
use ftx::config::Config;
use ftx::error::{FileError, Result};
use ftx::locks::{self, LockInfo, StagingOutcome};

pub fn cmd_lock_list(args: LockListArgs, config: &Config) -> Result<()> {
    let locks = locks::list_locks(&args.dir, config)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {}:", lock.target.display());
        print_details(lock, "    ");
        if lock.is_stale {
            println!(
                "    Status:     STALE (exceeds {} min threshold)",
                config.lock_stale_minutes
            );
        }
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale. Use `ftx lock clear <path> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

pub fn cmd_lock_clear(args: LockClearArgs, config: &Config) -> Result<()> {
    // Require --force flag
    if !args.force {
        return Err(FileError::Config(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock while its holder is still running can corrupt the file.\n\
             Only clear locks if you are certain the lock holder has crashed.\n\n\
             To clear the lock, run:\n  ftx lock clear {} --force",
            args.path.display()
        )));
    }

    let cleared = locks::clear_lock(&args.path, config)?;

    println!("Cleared lock: {}", cleared.info.path.display());
    println!();
    println!("Lock details:");
    print_details(&cleared.info, "  ");
    if cleared.info.is_stale {
        println!("  Status:     was STALE");
    }
    match cleared.staging {
        StagingOutcome::None => {}
        StagingOutcome::Discarded => println!("  Staging:    discarded unfinished update"),
        StagingOutcome::Restored => println!(
            "  Staging:    restored {} from unfinished commit",
            cleared.info.target.display()
        ),
    }

    Ok(())
}

fn print_details(lock: &LockInfo, indent: &str) {
    match &lock.metadata {
        Some(meta) => {
            println!("{}Owner:      {}", indent, meta.owner);
            if let Some(pid) = meta.pid {
                println!("{}PID:        {}", indent, pid);
            }
            println!("{}Mode:       {}", indent, meta.mode);
        }
        None => println!("{}Owner:      unknown (no metadata)", indent),
    }
    if let Some(created_at) = lock.created_at {
        println!(
            "{}Created:    {}",
            indent,
            created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("{}Age:        {}", indent, lock.age_string());
    if lock.has_staging_file {
        println!("{}Staging:    present", indent);
    }
    println!("{}Path:       {}", indent, lock.path.display());
}
