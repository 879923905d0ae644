//! Error types for the logging engine
//!
//! Append paths report [`WriteError`] and [`SnapshotError`], which the facade
//! swallows by default. Read, list and delete paths surface their errors
//! directly.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The logging root could not be created or is not writable
#[derive(Debug, Error)]
#[error("logging directory {path} is unusable: {source}")]
pub struct DirectoryError {
    /// Directory that failed to resolve
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A destination file exists but does not decode as a JSON array of entries
#[derive(Debug, Error)]
#[error("log file '{identifier}' is corrupt: {detail}")]
pub struct CorruptFileError {
    /// Source identifier of the destination file
    pub identifier: String,
    /// Decoder message
    pub detail: String,
}

/// Category of an append failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    /// Filesystem failure (including an unusable logging root)
    IoFailure,
    /// The entry or its payload could not be encoded
    SerializationFailure,
    /// The destination holds undecodable data; it was left untouched
    CorruptFile,
}

impl fmt::Display for WriteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteErrorKind::IoFailure => "I/O failure",
            WriteErrorKind::SerializationFailure => "serialization failure",
            WriteErrorKind::CorruptFile => "corrupt destination",
        };
        f.write_str(label)
    }
}

/// An append did not reach disk
#[derive(Debug, Error)]
#[error("{kind} while appending to '{identifier}': {detail}")]
pub struct WriteError {
    pub kind: WriteErrorKind,
    /// Destination the append targeted
    pub identifier: String,
    pub detail: String,
}

impl WriteError {
    pub(crate) fn io(identifier: &str, err: impl fmt::Display) -> Self {
        Self {
            kind: WriteErrorKind::IoFailure,
            identifier: identifier.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn serialization(identifier: &str, err: impl fmt::Display) -> Self {
        Self {
            kind: WriteErrorKind::SerializationFailure,
            identifier: identifier.to_string(),
            detail: err.to_string(),
        }
    }
}

impl From<CorruptFileError> for WriteError {
    fn from(err: CorruptFileError) -> Self {
        Self {
            kind: WriteErrorKind::CorruptFile,
            identifier: err.identifier,
            detail: err.detail,
        }
    }
}

/// Failure of a read or listing operation
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Corrupt(#[from] CorruptFileError),

    #[error("failed to read log files: {0}")]
    Io(#[from] io::Error),
}

/// Failure to remove one or more destination files
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("failed to delete log file '{identifier}': {source}")]
    File {
        identifier: String,
        #[source]
        source: io::Error,
    },

    /// Some files were removed before others failed; nothing is rolled back
    #[error("failed to delete {} log file(s): {}", failures.len(), failed_identifiers(failures))]
    Partial { failures: Vec<(String, io::Error)> },

    #[error("failed to enumerate log files: {0}")]
    Enumerate(#[source] io::Error),
}

impl DeleteError {
    /// Identifiers whose removal failed
    pub fn failed(&self) -> Vec<&str> {
        match self {
            DeleteError::File { identifier, .. } => vec![identifier.as_str()],
            DeleteError::Partial { failures } => failures.iter().map(|(id, _)| id.as_str()).collect(),
            DeleteError::Directory(_) | DeleteError::Enumerate(_) => Vec::new(),
        }
    }
}

fn failed_identifiers(failures: &[(String, io::Error)]) -> String {
    failures
        .iter()
        .map(|(id, _)| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The global engine was configured after it had already been created
#[derive(Debug, Error)]
#[error("logbook is already initialised")]
pub struct AlreadyInitialized;

/// One object of a snapshot batch failed
#[derive(Debug, Error)]
#[error("snapshot of {type_label} (#{index}) failed: {source}")]
pub struct SnapshotFailure {
    /// Position of the object in the batch
    pub index: usize,
    pub type_label: String,
    #[source]
    pub source: WriteError,
}

/// Accumulated failures of a snapshot batch
///
/// Objects that are not listed here were written.
#[derive(Debug, Error)]
#[error("{} of {attempted} snapshot(s) failed", failures.len())]
pub struct SnapshotError {
    pub attempted: usize,
    pub failures: Vec<SnapshotFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_converts_to_write_error() {
        let err: WriteError = CorruptFileError {
            identifier: "Foo".to_string(),
            detail: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.kind, WriteErrorKind::CorruptFile);
        assert_eq!(err.identifier, "Foo");
        assert!(err.to_string().contains("corrupt destination"));
    }

    #[test]
    fn test_partial_delete_lists_identifiers() {
        let err = DeleteError::Partial {
            failures: vec![
                ("A".to_string(), io::Error::from(io::ErrorKind::PermissionDenied)),
                ("B".to_string(), io::Error::from(io::ErrorKind::Other)),
            ],
        };
        assert_eq!(err.failed(), vec!["A", "B"]);
        assert!(err.to_string().contains("A, B"));
    }
}
