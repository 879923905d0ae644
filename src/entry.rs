//! Log entry model
//!
//! A [`LogEntry`] is the immutable record stored in destination files. Its
//! JSON shape is fixed: `message`, `objectName`, `objectData` (base64),
//! `level` (uppercase token), `isSnapshot`, `file`, `function`, `line` and an
//! RFC 3339 `timestamp`.

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Severity of a log entry
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// All levels, lowest severity first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Get the on-disk token for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Where a log call originated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl CallSite {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }

    /// Build a call site from a `#[track_caller]` location
    ///
    /// Locations carry no function name, so `function` is left as `"<unknown>"`.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), "<unknown>", location.line())
    }

    /// Build a call site from the type path of a marker item nested in the
    /// calling function (see `call_site!`)
    #[doc(hidden)]
    pub fn from_marker(file: &str, marker_path: &str, line: u32) -> Self {
        let mut function = marker_path
            .rsplit_once("::")
            .map(|(parent, _)| parent)
            .unwrap_or(marker_path);
        while let Some(outer) = function.strip_suffix("::{{closure}}") {
            function = outer;
        }
        Self::new(file, function, line)
    }
}

/// A single persisted log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default, with = "object_data_serde")]
    pub object_data: Option<Vec<u8>>,
    pub level: LogLevel,
    #[serde(default)]
    pub is_snapshot: bool,
    /// Originating source file as recorded at the call site
    #[serde(rename = "file")]
    pub source_file: String,
    pub function: String,
    pub line: u32,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create a plain message entry
    pub fn new(message: impl Into<String>, level: LogLevel, call_site: CallSite) -> Self {
        Self {
            message: message.into(),
            object_name: None,
            object_data: None,
            level,
            is_snapshot: false,
            source_file: call_site.file,
            function: call_site.function,
            line: call_site.line,
            timestamp: Utc::now(),
        }
    }

    /// Attach a serialized object; name and data always travel together
    pub fn with_object(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.object_name = Some(name.into());
        self.object_data = Some(data);
        self
    }

    /// Mark this entry as a snapshot of its attached object
    pub(crate) fn into_snapshot(mut self) -> Self {
        self.is_snapshot = true;
        self
    }

    /// Destination identifier this entry is written to
    pub fn source_identifier(&self) -> String {
        source_identifier(&self.source_file)
    }

    /// Whether the object pair is consistent (both present or both absent)
    pub fn has_consistent_object(&self) -> bool {
        self.object_name.is_some() == self.object_data.is_some()
    }

    /// Decode the attached object back into a typed value
    ///
    /// Returns `None` when the entry carries no object.
    pub fn decode_object<T: DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.object_data
            .as_deref()
            .map(|bytes| serde_json::from_slice(bytes))
    }
}

/// Derive the destination identifier for a source file path
///
/// Takes the basename, drops its extension and replaces anything outside
/// `[A-Za-z0-9_-]` with `_`. Never returns an empty string.
pub fn source_identifier(source_file: &str) -> String {
    let basename = source_file
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(source_file);

    let stem = match basename.rfind('.') {
        Some(0) | None => basename,
        Some(pos) => &basename[..pos],
    };

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

mod object_data_serde {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| BASE64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
