//! `cat`, `create`, `update` and `hold`.
//!
//! Input is read completely before a file is opened, so a slow stdin never
//! keeps a lock held.

use crate::cli::{CatArgs, CreateArgs, HoldArgs, UpdateArgs};
use ftx::context::FileAccess;
use ftx::error::{FileError, Result};
use ftx::handle::OpenMode;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

pub fn cmd_cat(access: &FileAccess, args: CatArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    copy_to(access, &args.path, &mut out)?;
    out.flush()
        .map_err(|e| FileError::stream("failed to flush stdout", e))
}

pub fn cmd_create(access: &FileAccess, args: CreateArgs) -> Result<()> {
    let content = read_input(args.input.as_deref())?;
    create_with(access, &args.path, &content)?;
    println!("Created {} ({} bytes)", args.path.display(), content.len());
    Ok(())
}

pub fn cmd_update(access: &FileAccess, args: UpdateArgs) -> Result<()> {
    let content = read_input(args.input.as_deref())?;
    let written = update_with(access, &args.path, &content, args.append)?;
    println!("Updated {} ({} bytes)", args.path.display(), written);
    Ok(())
}

pub fn cmd_hold(access: &FileAccess, args: HoldArgs) -> Result<()> {
    let hold_for = Duration::try_from_secs_f64(args.seconds).map_err(|e| {
        FileError::Config(format!(
            "--seconds must be a non-negative number of seconds (found {}: {})",
            args.seconds, e
        ))
    })?;

    let mode = OpenMode::from(args.mode);
    let mut handle = access.open(&args.path, mode)?;

    // Scripts wait for this line before racing the holder.
    println!("Holding {} ({})", args.path.display(), mode);
    io::stdout()
        .flush()
        .map_err(|e| FileError::stream("failed to flush stdout", e))?;

    if access.cancel_token().sleep(hold_for) {
        handle.close()?;
        return Err(FileError::Cancelled(format!(
            "hold on {} was interrupted",
            args.path.display()
        )));
    }

    if args.commit {
        handle.commit()?;
        println!("Committed {}", args.path.display());
    } else {
        handle.close()?;
        println!("Released {}", args.path.display());
    }
    Ok(())
}

/// Copy the content of `path` to `out` under the read protocol.
pub(super) fn copy_to(access: &FileAccess, path: &Path, out: &mut dyn Write) -> Result<u64> {
    let mut handle = access.open_for_read(path)?;
    let copied = io::copy(&mut handle.file_for_read()?, out)
        .map_err(|e| FileError::stream(format!("failed to read {}", path.display()), e))?;
    handle.close()?;
    Ok(copied)
}

/// Create `path` holding `content` and commit it.
pub(super) fn create_with(access: &FileAccess, path: &Path, content: &[u8]) -> Result<()> {
    let mut handle = access.open_for_create(path)?;
    handle
        .file_for_write()?
        .write_all(content)
        .map_err(|e| FileError::stream(format!("failed to write {}", path.display()), e))?;
    access.commit(&mut handle)
}

/// Replace (or extend) the content of `path` and commit it.
///
/// # Returns
///
/// The size of the new content in bytes.
pub(super) fn update_with(
    access: &FileAccess,
    path: &Path,
    content: &[u8],
    append: bool,
) -> Result<u64> {
    let mut handle = access.open_for_update(path)?;
    let write_err =
        |e: io::Error| FileError::stream(format!("failed to write {}", path.display()), e);

    let mut writer = handle.file_for_write()?;
    let mut written = 0;
    if append {
        let mut reader = handle.file_for_read()?;
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| FileError::stream(format!("failed to read {}", path.display()), e))?;
        written = io::copy(&mut reader, &mut writer).map_err(write_err)?;
    }
    writer.write_all(content).map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    written += content.len() as u64;
    drop(writer);

    access.commit(&mut handle)?;
    Ok(written)
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    match input {
        Some(path) => {
            content = std::fs::read(path).map_err(|e| {
                FileError::stream(format!("failed to read input '{}'", path.display()), e)
            })?;
        }
        None => {
            io::stdin()
                .read_to_end(&mut content)
                .map_err(|e| FileError::stream("failed to read stdin", e))?;
        }
    }
    Ok(content)
}
