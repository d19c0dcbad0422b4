//! ftx: transactional access to flat files shared between processes.
//!
//! Each file `F` may be guarded by a sibling lock file `.F.lock`, created
//! exclusively by whoever wants to change `F`. Updates are written to a
//! sibling staging file `.F.temp` and swapped in on commit, so readers see
//! either the old content or the new one. Creations are rolled back (the
//! new file deleted) unless committed.
//!
//! ```no_run
//! use ftx::{Config, FileAccess};
//! use std::io::Write;
//!
//! # fn main() -> ftx::Result<()> {
//! let access = FileAccess::new(Config::default())?;
//! let mut handle = access.open_for_update("data.txt")?;
//! handle
//!     .file_for_write()?
//!     .write_all(b"new content")
//!     .map_err(|e| ftx::FileError::stream("write", e))?;
//! handle.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod handle;
pub mod locks;
pub mod logging;
pub mod registry;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::CancelToken;
pub use config::{Config, ReplaceMode};
pub use context::FileAccess;
pub use error::{FileError, Result};
pub use handle::{HandleStatus, OpenMode, ReadStream, ResourceHandle, WriteStream};
