//! Append-and-rotate writes to destination files
//!
//! Each append is a read-modify-write of one destination file performed
//! under that destination's lock. The new contents are written to a
//! temporary file in the logging root and renamed over the destination, so
//! readers see either the previous file or the new one.

mod locks;
mod rotation;

pub use locks::{acquire, DestinationLocks};
pub use rotation::ROTATION_THRESHOLD_BYTES;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use crate::directory::LogDirectory;
use crate::entry::LogEntry;
use crate::error::{CorruptFileError, WriteError};

/// Result of a successful append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Destination the entry was written to
    pub identifier: String,
    /// Entries in the destination after the append
    pub entries: usize,
    /// Oldest entries dropped by rotation
    pub evicted: usize,
    /// Size of the destination file in bytes
    pub bytes: u64,
}

/// Serializes appends per destination file
#[derive(Debug)]
pub struct LogWriter {
    directory: Arc<LogDirectory>,
    locks: Arc<DestinationLocks>,
    threshold: u64,
}

impl LogWriter {
    /// Create a writer; `locks` must be shared with anything that deletes files
    pub fn new(directory: Arc<LogDirectory>, locks: Arc<DestinationLocks>) -> Self {
        Self::with_threshold(directory, locks, ROTATION_THRESHOLD_BYTES)
    }

    /// Writer with a custom rotation threshold (for testing)
    pub(crate) fn with_threshold(
        directory: Arc<LogDirectory>,
        locks: Arc<DestinationLocks>,
        threshold: u64,
    ) -> Self {
        Self {
            directory,
            locks,
            threshold,
        }
    }

    /// Append an entry to the destination derived from its source file
    pub fn append(&self, entry: &LogEntry) -> Result<AppendOutcome, WriteError> {
        let identifier = entry.source_identifier();

        if !entry.has_consistent_object() {
            return Err(WriteError::serialization(
                &identifier,
                "objectName and objectData must be set together",
            ));
        }

        let encoded_entry =
            serde_json::to_vec(entry).map_err(|e| WriteError::serialization(&identifier, e))?;

        let root = self
            .directory
            .resolve_root()
            .map_err(|e| WriteError::io(&identifier, e))?;
        let path = LogDirectory::file_path(root, &identifier);

        let lock = self.locks.handle(&identifier);
        let _guard = acquire(&lock);

        let existing = read_existing(&path, &identifier)?;

        let mut encoded = Vec::with_capacity(existing.len() + 1);
        for old in &existing {
            encoded.push(
                serde_json::to_vec(old).map_err(|e| WriteError::serialization(&identifier, e))?,
            );
        }
        encoded.push(encoded_entry);

        let sizes: Vec<u64> = encoded.iter().map(|e| e.len() as u64).collect();
        let evicted = rotation::evictions_needed(&sizes, self.threshold);
        let kept = &encoded[evicted..];

        let mut contents = Vec::with_capacity(rotation::array_size(&sizes[evicted..]) as usize);
        contents.push(b'[');
        for (i, bytes) in kept.iter().enumerate() {
            if i > 0 {
                contents.push(b',');
            }
            contents.extend_from_slice(bytes);
        }
        contents.push(b']');

        write_atomically(root, &path, &contents).map_err(|e| WriteError::io(&identifier, e))?;

        if evicted > 0 {
            tracing::debug!(
                "Rotated log file {}: dropped {} oldest entries",
                identifier,
                evicted
            );
        }

        Ok(AppendOutcome {
            identifier,
            entries: kept.len(),
            evicted,
            bytes: contents.len() as u64,
        })
    }
}

/// Read the current entries of a destination
///
/// A missing or blank file holds no entries. Bytes that do not decode abort
/// the append so the file is never overwritten blindly.
fn read_existing(path: &Path, identifier: &str) -> Result<Vec<LogEntry>, WriteError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WriteError::io(identifier, e)),
    };

    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&content).map_err(|e| {
        tracing::warn!("Refusing to append to corrupt log file {}: {}", path.display(), e);
        WriteError::from(CorruptFileError {
            identifier: identifier.to_string(),
            detail: e.to_string(),
        })
    })
}

/// Write `contents` to a temporary file in `root` and rename it over `path`
fn write_atomically(root: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(root)?;

    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
