//! Logging root resolution
//!
//! The root is created on first use and memoized for the lifetime of the
//! owning engine. A failed resolution is not cached, so a later call retries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::entry::source_identifier;
use crate::error::DirectoryError;

/// Name of the logging subdirectory under the host's storage area
pub const LOGGING_SUBDIR: &str = "logging";

/// Extension of destination files
pub const LOG_FILE_EXTENSION: &str = "json";

/// Lazily created logging root
#[derive(Debug)]
pub struct LogDirectory {
    root: PathBuf,
    resolved: OnceLock<PathBuf>,
}

impl LogDirectory {
    /// Logging root under a host storage directory (`<storage_dir>/logging`)
    pub fn under(storage_dir: &Path) -> Self {
        Self::at(storage_dir.join(LOGGING_SUBDIR))
    }

    /// Logging root at an exact path
    pub fn at(root: PathBuf) -> Self {
        Self {
            root,
            resolved: OnceLock::new(),
        }
    }

    /// Configured root path, whether or not it exists yet
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the root, creating it and verifying it is writable on first use
    pub fn resolve_root(&self) -> Result<&Path, DirectoryError> {
        if let Some(root) = self.resolved.get() {
            return Ok(root);
        }

        let err = |source| DirectoryError {
            path: self.root.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(err)?;
        // Probe writability with an anonymous file that is removed on drop
        tempfile::tempfile_in(&self.root).map_err(err)?;

        tracing::debug!("Logging root ready at {}", self.root.display());
        Ok(self.resolved.get_or_init(|| self.root.clone()))
    }

    /// Path of the destination file for a source identifier
    pub fn file_path(root: &Path, identifier: &str) -> PathBuf {
        root.join(format!("{}.{}", identifier, LOG_FILE_EXTENSION))
    }

    /// Source identifier of a destination file, if the path names one
    ///
    /// Dot-prefixed files (in-flight temporaries), other extensions and
    /// stems the engine never produces (e.g. `v1.2.json`) are not destination
    /// files: an identifier returned here always maps back to `path`.
    pub fn identifier_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with('.') {
            return None;
        }
        if path.extension()?.to_str()? != LOG_FILE_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        (source_identifier(stem) == stem).then(|| stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let dir = LogDirectory::under(temp_dir.path());

        assert!(!dir.path().exists());
        let root = dir.resolve_root().unwrap().to_path_buf();
        assert!(root.is_dir());
        assert!(root.ends_with(LOGGING_SUBDIR));

        // Idempotent
        assert_eq!(dir.resolve_root().unwrap(), root.as_path());
    }

    #[test]
    fn test_resolve_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("logging");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let dir = LogDirectory::under(temp_dir.path());
        let err = dir.resolve_root().unwrap_err();
        assert_eq!(err.path, blocker);

        // Not cached: once the obstacle is gone the root resolves
        std::fs::remove_file(&blocker).unwrap();
        assert!(dir.resolve_root().is_ok());
    }

    #[test]
    fn test_file_path_and_identifier() {
        let root = Path::new("/tmp/logbook/logging");
        let path = LogDirectory::file_path(root, "Foo");
        assert_eq!(path, root.join("Foo.json"));
        assert_eq!(LogDirectory::identifier_of(&path).as_deref(), Some("Foo"));

        assert!(LogDirectory::identifier_of(&root.join(".tmpX1y2.json")).is_none());
        assert!(LogDirectory::identifier_of(&root.join("notes.txt")).is_none());
        assert!(LogDirectory::identifier_of(&root.join("README")).is_none());
    }

    #[test]
    fn test_unaddressable_stems_are_not_destinations() {
        let root = Path::new("/tmp/logbook/logging");
        assert!(LogDirectory::identifier_of(&root.join("v1.2.json")).is_none());
        assert!(LogDirectory::identifier_of(&root.join("my file.json")).is_none());
        assert_eq!(
            LogDirectory::identifier_of(&root.join("my_file-2.json")).as_deref(),
            Some("my_file-2")
        );
    }
}
