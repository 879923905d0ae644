//! Enumeration, read-back, statistics and deletion of destination files

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::directory::{LogDirectory, LOG_FILE_EXTENSION};
use crate::entry::{source_identifier, LogEntry, LogLevel};
use crate::error::{CorruptFileError, DeleteError, ReadError};
use crate::writer::{acquire, DestinationLocks};

/// Summary of one destination file, recomputed on every listing
#[derive(Debug, Clone, PartialEq)]
pub struct LogFileSummary {
    /// File name including extension (e.g. `Foo.json`)
    pub file_name: String,
    /// Size on disk in bytes
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Entries per level; empty when the file does not decode
    pub level_counts: BTreeMap<LogLevel, usize>,
    pub entry_count: usize,
    /// Set when the file could not be decoded
    pub decode_error: Option<String>,
}

impl LogFileSummary {
    /// Source identifier to pass back to load or delete operations
    pub fn identifier(&self) -> &str {
        self.file_name
            .strip_suffix(LOG_FILE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.file_name)
    }

    /// Number of entries at a level
    pub fn count(&self, level: LogLevel) -> usize {
        self.level_counts.get(&level).copied().unwrap_or(0)
    }

    pub fn is_corrupt(&self) -> bool {
        self.decode_error.is_some()
    }
}

/// Totals across all destination files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub file_count: usize,
    /// Sum of file sizes in bytes
    pub total_size: u64,
}

/// Read and delete access to destination files
#[derive(Debug)]
pub struct LogStore {
    directory: Arc<LogDirectory>,
    locks: Arc<DestinationLocks>,
}

impl LogStore {
    /// Create a store; `locks` must be the registry the writer uses
    pub fn new(directory: Arc<LogDirectory>, locks: Arc<DestinationLocks>) -> Self {
        Self { directory, locks }
    }

    /// Summarize every destination file, most recently modified first
    ///
    /// Files that fail to decode are listed with `decode_error` set rather
    /// than failing the listing.
    pub fn list_files(&self) -> Result<Vec<LogFileSummary>, ReadError> {
        let root = self.directory.resolve_root()?;
        let mut summaries = Vec::new();

        for dir_entry in fs::read_dir(root)? {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    continue;
                }
            };
            let path = dir_entry.path();
            if LogDirectory::identifier_of(&path).is_none() {
                continue;
            }

            let summary = dir_entry.file_type().and_then(|file_type| {
                if file_type.is_file() {
                    summarize(&path).map(Some)
                } else {
                    Ok(None)
                }
            });
            if let Some(summary) = listed(&path, summary) {
                summaries.push(summary);
            }
        }

        summaries.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(summaries)
    }

    /// Load all entries of one destination in write order
    ///
    /// A destination that does not exist yet holds no entries.
    pub fn load_entries(&self, identifier: &str) -> Result<Vec<LogEntry>, ReadError> {
        let root = self.directory.resolve_root()?;
        let identifier = source_identifier(identifier);
        let path = LogDirectory::file_path(root, &identifier);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        decode_entries(&content).map_err(|e| {
            ReadError::from(CorruptFileError {
                identifier,
                detail: e.to_string(),
            })
        })
    }

    /// Load entries of one destination at or above `min_level`
    pub fn load_entries_filtered(
        &self,
        identifier: &str,
        min_level: LogLevel,
    ) -> Result<Vec<LogEntry>, ReadError> {
        let mut entries = self.load_entries(identifier)?;
        entries.retain(|e| e.level >= min_level);
        Ok(entries)
    }

    /// Remove one destination file; removing a missing file succeeds
    pub fn delete_file(&self, identifier: &str) -> Result<(), DeleteError> {
        let root = self.directory.resolve_root()?;
        let identifier = source_identifier(identifier);
        self.remove(root, &identifier)
            .map_err(|source| DeleteError::File { identifier, source })
    }

    /// Remove every destination file, returning how many were removed
    ///
    /// Failures do not stop the batch; they are reported together afterwards.
    pub fn clear_all(&self) -> Result<usize, DeleteError> {
        let root = self.directory.resolve_root()?;
        let mut removed = 0;
        let mut failures = Vec::new();

        for dir_entry in fs::read_dir(root).map_err(DeleteError::Enumerate)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    failures.push((UNREADABLE_ENTRY.to_string(), e));
                    continue;
                }
            };
            let Some(identifier) = LogDirectory::identifier_of(&path) else {
                continue;
            };

            match self.remove(root, &identifier) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!("Failed to delete log file {}: {}", path.display(), e);
                    failures.push((identifier, e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(DeleteError::Partial { failures });
        }

        tracing::info!("Cleared {} log files", removed);
        Ok(removed)
    }

    /// File count and total size across all destination files
    pub fn stats(&self) -> Result<AggregateStats, ReadError> {
        let summaries = self.list_files()?;
        Ok(AggregateStats {
            file_count: summaries.len(),
            total_size: summaries.iter().map(|s| s.size).sum(),
        })
    }

    fn remove(&self, root: &Path, identifier: &str) -> io::Result<()> {
        let lock = self.locks.handle(identifier);
        let _guard = acquire(&lock);

        match fs::remove_file(LogDirectory::file_path(root, identifier)) {
            Ok(()) => {
                tracing::info!("Deleted log file {}", identifier);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Failure label for a directory entry whose name could not be read
const UNREADABLE_ENTRY: &str = "<unreadable entry>";

/// Keep a file in a listing unless it vanished or could not be inspected
fn listed(path: &Path, summary: io::Result<Option<LogFileSummary>>) -> Option<LogFileSummary> {
    match summary {
        Ok(summary) => summary,
        // Deleted between enumeration and stat
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Skipping log file {}: {}", path.display(), e);
            None
        }
    }
}

/// Decode a destination file; blank content holds no entries
fn decode_entries(content: &[u8]) -> serde_json::Result<Vec<LogEntry>> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(content)
}

fn summarize(path: &Path) -> io::Result<LogFileSummary> {
    let metadata = fs::metadata(path)?;
    let last_modified: DateTime<Utc> = metadata.modified()?.into();
    let decoded = match fs::read(path) {
        Ok(content) => decode_entries(&content).map_err(|e| e.to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
        Err(e) => Err(format!("unreadable: {}", e)),
    };

    let mut level_counts = BTreeMap::new();
    let mut entry_count = 0;
    let decode_error = match decoded {
        Ok(entries) => {
            entry_count = entries.len();
            for entry in &entries {
                *level_counts.entry(entry.level).or_insert(0) += 1;
            }
            None
        }
        Err(e) => {
            tracing::warn!("Could not decode log file {}: {}", path.display(), e);
            Some(e)
        }
    };

    Ok(LogFileSummary {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        last_modified,
        level_counts,
        entry_count,
        decode_error,
    })
}
