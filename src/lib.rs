//! Logbook - structured, file-persisted logging
//!
//! Log entries are stored as one JSON array per source file under a
//! `logging/` directory. Each file is capped at 10 MiB by dropping its oldest
//! entries, and every write replaces the file atomically.

pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod facade;
pub mod snapshot;
pub mod store;
pub mod writer;

pub use config::Config;
pub use entry::{source_identifier, CallSite, LogEntry, LogLevel};
pub use error::{
    AlreadyInitialized, CorruptFileError, DeleteError, DirectoryError, ReadError, SnapshotError,
    SnapshotFailure, WriteError, WriteErrorKind,
};
pub use facade::{
    clear_logs, delete_log_file, global, init, list_log_files, load_log_entries, log,
    log_file_stats, snapshot, try_log, try_snapshot, Logbook,
};
pub use snapshot::{Loggable, SNAPSHOT_IDENTIFIER};
pub use store::{AggregateStats, LogFileSummary};
pub use writer::{AppendOutcome, ROTATION_THRESHOLD_BYTES};
