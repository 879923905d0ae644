//! Object snapshots
//!
//! Serializes arbitrary values into synthetic log entries. All snapshots go
//! to a single `snapshot` destination regardless of where they were taken.

use std::sync::Arc;

use serde::Serialize;

use crate::entry::{CallSite, LogEntry, LogLevel};
use crate::error::{SnapshotError, SnapshotFailure, WriteError};
use crate::writer::LogWriter;

/// Destination identifier shared by every snapshot
pub const SNAPSHOT_IDENTIFIER: &str = "snapshot";

/// A value that can be attached to a log entry
///
/// Implemented for every `Serialize` type. Types that cannot derive
/// `Serialize` can implement it by hand.
pub trait Loggable {
    /// Display name of the value's type
    fn type_label(&self) -> String;

    /// Encode the value as JSON bytes
    fn to_structured_bytes(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + ?Sized> Loggable for T {
    fn type_label(&self) -> String {
        short_type_name(std::any::type_name::<T>())
    }

    fn to_structured_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Strip module paths from a type name (`a::B<c::D>` becomes `B<D>`)
pub fn short_type_name(full: &str) -> String {
    fn last_segment(path: &str) -> &str {
        path.rsplit("::").next().unwrap_or(path)
    }

    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            path.push(c);
        } else {
            out.push_str(last_segment(&path));
            path.clear();
            out.push(c);
        }
    }
    out.push_str(last_segment(&path));
    out
}

/// Build the snapshot entry for one value
pub fn snapshot_entry(object: &dyn Loggable, level: LogLevel) -> serde_json::Result<LogEntry> {
    let label = object.type_label();
    let data = object.to_structured_bytes()?;
    let call_site = CallSite::new(SNAPSHOT_IDENTIFIER, SNAPSHOT_IDENTIFIER, 0);

    Ok(LogEntry::new(format!("Snapshot of {}", label), level, call_site)
        .with_object(label, data)
        .into_snapshot())
}

/// Routes snapshot entries through the writer
#[derive(Debug)]
pub struct SnapshotService {
    writer: Arc<LogWriter>,
}

impl SnapshotService {
    pub fn new(writer: Arc<LogWriter>) -> Self {
        Self { writer }
    }

    /// Snapshot each object at `Debug` level
    pub fn snapshot(&self, objects: &[&dyn Loggable]) -> Result<usize, SnapshotError> {
        self.snapshot_with_level(objects, LogLevel::Debug)
    }

    /// Snapshot each object, continuing past failures
    ///
    /// Returns how many snapshots were written, or every failure of the batch.
    pub fn snapshot_with_level(
        &self,
        objects: &[&dyn Loggable],
        level: LogLevel,
    ) -> Result<usize, SnapshotError> {
        let mut failures = Vec::new();

        for (index, object) in objects.iter().enumerate() {
            let result = snapshot_entry(*object, level)
                .map_err(|e| WriteError::serialization(SNAPSHOT_IDENTIFIER, e))
                .and_then(|entry| self.writer.append(&entry));

            if let Err(source) = result {
                failures.push(SnapshotFailure {
                    index,
                    type_label: object.type_label(),
                    source,
                });
            }
        }

        if failures.is_empty() {
            Ok(objects.len())
        } else {
            Err(SnapshotError {
                attempted: objects.len(),
                failures,
            })
        }
    }
}
