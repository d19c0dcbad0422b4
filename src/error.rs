//! Error types for the file access layer.
//!
//! Uses thiserror for derive macros. Each variant is a distinct failure class
//! callers are expected to react to differently: a `Lock` error is worth
//! retrying, a `Timeout` is a definitive "no", and `CommitLost` means data is
//! only recoverable from the staging file.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for file access operations.
#[derive(Error, Debug)]
pub enum FileError {
    /// A precondition about file existence was violated.
    #[error("{0}")]
    Io(String),

    /// The lock file is currently held by someone else.
    #[error("{0}")]
    Lock(String),

    /// The bounded wait for a lock expired.
    #[error("file {}: waited too long for the lock to be released", .path.display())]
    Timeout { path: PathBuf },

    /// A wait was aborted through its cancellation token.
    #[error("{0}")]
    Cancelled(String),

    /// The same path is already open for writing in this process.
    #[error("file {} already opened", .path.display())]
    AlreadyOpened { path: PathBuf },

    /// The handle has already been committed or closed.
    #[error("file {} is already closed", .path.display())]
    Closed { path: PathBuf },

    /// An underlying stream or filesystem call failed.
    #[error("{context}: {source}")]
    Stream {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The original was removed but the staged file could not be renamed over it.
    #[error(
        "DATA LOSS: file {} was removed but the new content could not be moved into place; \
         the new content is preserved at {}: {source}",
        .path.display(),
        .staged.display()
    )]
    CommitLost {
        path: PathBuf,
        staged: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failures collected during best-effort teardown.
    #[error("{}", join_errors(.0))]
    Aggregate(Vec<FileError>),

    /// Invalid configuration or user input.
    #[error("{0}")]
    Config(String),
}

impl FileError {
    /// Wrap an `io::Error` with a short description of what was attempted.
    pub fn stream(context: impl Into<String>, source: std::io::Error) -> Self {
        FileError::Stream {
            context: context.into(),
            source,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FileError::Lock(_))
    }

    /// Flatten this error into its leaf errors.
    ///
    /// Nested aggregates are expanded so teardown reports never contain
    /// aggregates of aggregates.
    pub fn into_errors(self) -> Vec<FileError> {
        match self {
            FileError::Aggregate(errors) => {
                errors.into_iter().flat_map(FileError::into_errors).collect()
            }
            other => vec![other],
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FileError::Io(_) | FileError::Stream { .. } | FileError::Closed { .. } => {
                exit_codes::IO_FAILURE
            }
            FileError::Lock(_) | FileError::AlreadyOpened { .. } => exit_codes::LOCK_FAILURE,
            FileError::Timeout { .. } => exit_codes::TIMEOUT,
            FileError::Cancelled(_) => exit_codes::INTERRUPTED,
            FileError::CommitLost { .. } => exit_codes::DATA_LOSS,
            FileError::Aggregate(errors) => {
                if errors
                    .iter()
                    .any(|e| e.exit_code() == exit_codes::DATA_LOSS)
                {
                    exit_codes::DATA_LOSS
                } else {
                    exit_codes::IO_FAILURE
                }
            }
            FileError::Config(_) => exit_codes::USER_ERROR,
        }
    }
}

fn join_errors(errors: &[FileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for file access operations.
pub type Result<T> = std::result::Result<T, FileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_error_has_correct_exit_code() {
        let err = FileError::Io("file t.csv does not exist".to_string());
        assert_eq!(err.exit_code(), exit_codes::IO_FAILURE);
    }

    #[test]
    fn lock_error_has_correct_exit_code() {
        let err = FileError::Lock("unable to create lock file".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert!(err.is_transient());
    }

    #[test]
    fn timeout_error_names_path() {
        let err = FileError::Timeout {
            path: PathBuf::from("/data/t.csv"),
        };
        assert_eq!(err.exit_code(), exit_codes::TIMEOUT);
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "file /data/t.csv: waited too long for the lock to be released"
        );
    }

    #[test]
    fn commit_lost_is_reported_distinctly() {
        let err = FileError::CommitLost {
            path: PathBuf::from("t.csv"),
            staged: PathBuf::from(".t.csv.temp"),
            source: io::Error::other("rename failed"),
        };
        assert_eq!(err.exit_code(), exit_codes::DATA_LOSS);
        assert!(err.to_string().starts_with("DATA LOSS"));
        assert!(err.to_string().contains(".t.csv.temp"));
    }

    #[test]
    fn aggregate_joins_messages_by_line() {
        let err = FileError::Aggregate(vec![
            FileError::Io("first".to_string()),
            FileError::Lock("second".to_string()),
        ]);
        assert_eq!(err.to_string(), "first\nsecond");
    }

    #[test]
    fn aggregate_with_data_loss_escalates_exit_code() {
        let err = FileError::Aggregate(vec![
            FileError::Io("first".to_string()),
            FileError::CommitLost {
                path: PathBuf::from("a"),
                staged: PathBuf::from(".a.temp"),
                source: io::Error::other("x"),
            },
        ]);
        assert_eq!(err.exit_code(), exit_codes::DATA_LOSS);
    }

    #[test]
    fn into_errors_flattens_nested_aggregates() {
        let err = FileError::Aggregate(vec![
            FileError::Io("a".to_string()),
            FileError::Aggregate(vec![
                FileError::Io("b".to_string()),
                FileError::Io("c".to_string()),
            ]),
        ]);
        let leaves: Vec<String> = err.into_errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(leaves, vec!["a", "b", "c"]);
    }
}
