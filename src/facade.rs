//! Public entry points
//!
//! [`Logbook`] composes the directory, writer, store and snapshot service.
//! The free functions operate on a process-wide instance that is created on
//! first use from [`Config::default`], or from the configuration passed to
//! [`init`].
//!
//! Append paths (`log`, `snapshot`) never fail from the caller's point of
//! view: errors are reported through `tracing` and dropped. Use the `try_`
//! variants to observe them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::directory::LogDirectory;
use crate::entry::{CallSite, LogEntry, LogLevel};
use crate::error::{AlreadyInitialized, DeleteError, ReadError, SnapshotError, WriteError};
use crate::snapshot::{Loggable, SnapshotService};
use crate::store::{AggregateStats, LogFileSummary, LogStore};
use crate::writer::{AppendOutcome, DestinationLocks, LogWriter, ROTATION_THRESHOLD_BYTES};

static GLOBAL: OnceLock<Logbook> = OnceLock::new();

/// A logging engine bound to one logging root
#[derive(Debug)]
pub struct Logbook {
    directory: Arc<LogDirectory>,
    writer: Arc<LogWriter>,
    store: LogStore,
    snapshots: SnapshotService,
}

impl Logbook {
    /// Engine writing under `<config.storage_dir>/logging`
    pub fn new(config: &Config) -> Self {
        Self::with_root(config.logging_root())
    }

    /// Engine writing directly into `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::build(LogDirectory::at(root.into()), ROTATION_THRESHOLD_BYTES)
    }

    /// Engine with a custom rotation threshold (for testing)
    #[doc(hidden)]
    pub fn with_root_and_threshold(root: impl Into<PathBuf>, threshold: u64) -> Self {
        Self::build(LogDirectory::at(root.into()), threshold)
    }

    fn build(directory: LogDirectory, threshold: u64) -> Self {
        let directory = Arc::new(directory);
        let locks = Arc::new(DestinationLocks::new());
        let writer = Arc::new(LogWriter::with_threshold(
            Arc::clone(&directory),
            Arc::clone(&locks),
            threshold,
        ));

        Self {
            store: LogStore::new(Arc::clone(&directory), locks),
            snapshots: SnapshotService::new(Arc::clone(&writer)),
            directory,
            writer,
        }
    }

    /// Configured logging root
    pub fn root(&self) -> &Path {
        self.directory.path()
    }

    /// Log a message from the caller's location; failures are dropped
    ///
    /// The caller's file and line are recorded but `function` is
    /// `"<unknown>"`; use [`log!`](crate::log!) to capture the function too.
    #[track_caller]
    pub fn log(&self, message: impl Into<String>, object: Option<&dyn Loggable>, level: LogLevel) {
        let call_site = CallSite::from_location(std::panic::Location::caller());
        self.log_at_or_warn(call_site, message, object, level)
    }

    /// Log a message attributed to an explicit call site; failures are dropped
    pub fn log_at_or_warn(
        &self,
        call_site: CallSite,
        message: impl Into<String>,
        object: Option<&dyn Loggable>,
        level: LogLevel,
    ) {
        if let Err(e) = self.log_at(call_site, message, object, level) {
            tracing::warn!("Dropped log entry: {}", e);
        }
    }

    /// Log a message from the caller's location, reporting failures
    ///
    /// Like [`Logbook::log`], the function name is not captured; pair
    /// [`call_site!`](crate::call_site!) with [`Logbook::log_at`] for that.
    #[track_caller]
    pub fn try_log(
        &self,
        message: impl Into<String>,
        object: Option<&dyn Loggable>,
        level: LogLevel,
    ) -> Result<AppendOutcome, WriteError> {
        let call_site = CallSite::from_location(std::panic::Location::caller());
        self.log_at(call_site, message, object, level)
    }

    /// Log a message attributed to an explicit call site
    pub fn log_at(
        &self,
        call_site: CallSite,
        message: impl Into<String>,
        object: Option<&dyn Loggable>,
        level: LogLevel,
    ) -> Result<AppendOutcome, WriteError> {
        let mut entry = LogEntry::new(message, level, call_site);

        if let Some(object) = object {
            let data = object
                .to_structured_bytes()
                .map_err(|e| WriteError::serialization(&entry.source_identifier(), e))?;
            entry = entry.with_object(object.type_label(), data);
        }

        self.writer.append(&entry)
    }

    /// Snapshot each object into the `snapshot` destination; failures are dropped
    pub fn snapshot(&self, objects: &[&dyn Loggable]) {
        if let Err(e) = self.try_snapshot(objects) {
            for failure in &e.failures {
                tracing::warn!("Dropped snapshot: {}", failure);
            }
        }
    }

    /// Snapshot each object, returning how many were written or every failure
    pub fn try_snapshot(&self, objects: &[&dyn Loggable]) -> Result<usize, SnapshotError> {
        self.snapshots.snapshot(objects)
    }

    /// Snapshot each object at a level other than `Debug`
    pub fn try_snapshot_with_level(
        &self,
        objects: &[&dyn Loggable],
        level: LogLevel,
    ) -> Result<usize, SnapshotError> {
        self.snapshots.snapshot_with_level(objects, level)
    }

    pub fn list_log_files(&self) -> Result<Vec<LogFileSummary>, ReadError> {
        self.store.list_files()
    }

    pub fn load_log_entries(&self, identifier: &str) -> Result<Vec<LogEntry>, ReadError> {
        self.store.load_entries(identifier)
    }

    pub fn load_log_entries_filtered(
        &self,
        identifier: &str,
        min_level: LogLevel,
    ) -> Result<Vec<LogEntry>, ReadError> {
        self.store.load_entries_filtered(identifier, min_level)
    }

    pub fn delete_log_file(&self, identifier: &str) -> Result<(), DeleteError> {
        self.store.delete_file(identifier)
    }

    /// Remove every destination file, returning how many were removed
    pub fn clear_logs(&self) -> Result<usize, DeleteError> {
        self.store.clear_all()
    }

    pub fn log_file_stats(&self) -> Result<AggregateStats, ReadError> {
        self.store.stats()
    }
}

/// Configure the process-wide engine before its first use
pub fn init(config: Config) -> Result<&'static Logbook, AlreadyInitialized> {
    let mut created = false;
    let logbook = GLOBAL.get_or_init(|| {
        created = true;
        Logbook::new(&config)
    });

    if created {
        tracing::debug!("Logbook initialised at {}", logbook.root().display());
        Ok(logbook)
    } else {
        Err(AlreadyInitialized)
    }
}

/// The process-wide engine, created from the default configuration if needed
pub fn global() -> &'static Logbook {
    GLOBAL.get_or_init(|| Logbook::new(&Config::default()))
}

/// Log a message from the caller's location; failures are dropped
///
/// Records `function` as `"<unknown>"`. Prefer [`log!`](crate::log!), which
/// also captures the enclosing function.
#[track_caller]
pub fn log(message: impl Into<String>, object: Option<&dyn Loggable>, level: LogLevel) {
    global().log(message, object, level)
}

/// Log a message from the caller's location, reporting failures
///
/// Records `function` as `"<unknown>"`, as [`log()`] does.
#[track_caller]
pub fn try_log(
    message: impl Into<String>,
    object: Option<&dyn Loggable>,
    level: LogLevel,
) -> Result<AppendOutcome, WriteError> {
    global().try_log(message, object, level)
}

pub fn snapshot(objects: &[&dyn Loggable]) {
    global().snapshot(objects)
}

pub fn try_snapshot(objects: &[&dyn Loggable]) -> Result<usize, SnapshotError> {
    global().try_snapshot(objects)
}

pub fn list_log_files() -> Result<Vec<LogFileSummary>, ReadError> {
    global().list_log_files()
}

pub fn load_log_entries(identifier: &str) -> Result<Vec<LogEntry>, ReadError> {
    global().load_log_entries(identifier)
}

pub fn delete_log_file(identifier: &str) -> Result<(), DeleteError> {
    global().delete_log_file(identifier)
}

pub fn clear_logs() -> Result<usize, DeleteError> {
    global().clear_logs()
}

pub fn log_file_stats() -> Result<AggregateStats, ReadError> {
    global().log_file_stats()
}

/// Capture the current file, line and enclosing function as a [`CallSite`]
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __logbook_marker() {}
        fn __logbook_type_name<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::CallSite::from_marker(file!(), __logbook_type_name(__logbook_marker), line!())
    }};
}

/// Log a formatted message through the process-wide engine
///
/// ```no_run
/// use logbook::LogLevel;
///
/// #[derive(serde::Serialize)]
/// struct Order { id: u32 }
///
/// logbook::log!("service started");
/// logbook::log!(LogLevel::Warning; "retrying in {}s", 5);
/// logbook::log!(LogLevel::Error, &Order { id: 7 }; "order rejected");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $object:expr; $($arg:tt)+) => {
        $crate::global().log_at_or_warn(
            $crate::call_site!(),
            format!($($arg)+),
            Some($object as &dyn $crate::Loggable),
            $level,
        )
    };
    ($level:expr; $($arg:tt)+) => {
        $crate::global().log_at_or_warn($crate::call_site!(), format!($($arg)+), None, $level)
    };
    ($($arg:tt)+) => {
        $crate::global().log_at_or_warn(
            $crate::call_site!(),
            format!($($arg)+),
            None,
            $crate::LogLevel::Info,
        )
    };
}
