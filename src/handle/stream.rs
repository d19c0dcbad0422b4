//! Streams over a handle's files.
//!
//! Each read or write briefly locks the handle's state, so a read stream and
//! a write stream can be used side by side (copying the "before" view into
//! the "after" view) and bulk teardown can still reach the handle between
//! calls. After teardown every call fails with an I/O error.

use super::{HandleState, OpenMode, SharedState, lock_state};
use crate::error::{FileError, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

impl HandleState {
    fn closed_io_error(&self) -> io::Error {
        io::Error::other(format!("file {} is already closed", self.path.display()))
    }

    fn read_target(&mut self) -> io::Result<&mut File> {
        if self.is_closed() {
            return Err(self.closed_io_error());
        }
        let err = self.closed_io_error();
        self.file.as_mut().ok_or(err)
    }

    fn write_target(&mut self) -> io::Result<&mut File> {
        let err = self.closed_io_error();
        if self.is_closed() {
            return Err(err);
        }
        match self.mode {
            OpenMode::Update => match self.staging.as_mut() {
                Some(staging) => staging.file_mut(),
                None => Err(err),
            },
            OpenMode::Create => self.file.as_mut().ok_or(err),
            OpenMode::Read => Err(io::Error::other(format!(
                "file {} is opened for reading only",
                self.path.display()
            ))),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(FileError::Closed {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

/// Reader over the real file.
pub struct ReadStream<'a> {
    state: &'a SharedState,
}

impl<'a> ReadStream<'a> {
    pub(super) fn new(state: &'a SharedState) -> Result<Self> {
        lock_state(state).ensure_open()?;
        Ok(Self { state })
    }
}

impl fmt::Debug for ReadStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStream")
            .field("path", &lock_state(self.state).path)
            .finish()
    }
}

impl Read for ReadStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        lock_state(self.state).read_target()?.read(buf)
    }
}

impl Seek for ReadStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        lock_state(self.state).read_target()?.seek(pos)
    }
}

/// Writer receiving the handle's new content.
pub struct WriteStream<'a> {
    state: &'a SharedState,
}

impl<'a> WriteStream<'a> {
    pub(super) fn new(state: &'a SharedState) -> Result<Self> {
        let state_guard = lock_state(state);
        state_guard.ensure_open()?;
        if state_guard.mode == OpenMode::Read {
            return Err(FileError::Io(format!(
                "file {} is opened for reading only",
                state_guard.path.display()
            )));
        }
        drop(state_guard);
        Ok(Self { state })
    }
}

impl fmt::Debug for WriteStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteStream")
            .field("path", &lock_state(self.state).path)
            .finish()
    }
}

impl Write for WriteStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_state(self.state).write_target()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        lock_state(self.state).write_target()?.flush()
    }
}

impl Seek for WriteStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        lock_state(self.state).write_target()?.seek(pos)
    }
}
