//! Error taxonomy for container readers and format adapters

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Position of a record inside a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordLocation {
    /// Ordinal of the archive member holding the record (0 for plain streams)
    pub container: u32,
    /// Ordinal of the record within the source, counting undecodable ones
    pub ordinal: u64,
    /// Archive member name, for tar and zip sources
    pub member: Option<String>,
}

impl RecordLocation {
    pub fn new(container: u32, ordinal: u64) -> Self {
        Self {
            container,
            ordinal,
            member: None,
        }
    }

    pub fn in_member(container: u32, ordinal: u64, member: impl Into<String>) -> Self {
        Self {
            container,
            ordinal,
            member: Some(member.into()),
        }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(m) => write!(f, "{m} (member {}), record {}", self.container, self.ordinal),
            None => write!(f, "record {}", self.ordinal),
        }
    }
}

/// One malformed record inside an otherwise healthy stream.
///
/// Never fatal: cursors log it, queue it for [`take_skipped`] and move on.
///
/// [`take_skipped`]: crate::table::Cursor::take_skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Name of the source that produced the record
    pub source: String,
    pub location: RecordLocation,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(source: impl Into<String>, location: RecordLocation, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            location,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: skipped {}: {}", self.source, self.location, self.reason)
    }
}

/// Fatal error for one source.
#[derive(Debug)]
pub enum SourceError {
    /// Input file missing or unreadable
    SourceUnavailable { path: PathBuf, cause: io::Error },
    /// Invalid outer archive or compression framing
    CorruptContainer { path: PathBuf, message: String },
    /// Table name not served by the source
    UnknownTable { source: String, table: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { path, cause } => {
                write!(f, "source unavailable: {}: {cause}", path.display())
            }
            Self::CorruptContainer { path, message } => {
                write!(f, "corrupt container: {}: {message}", path.display())
            }
            Self::UnknownTable { source, table } => {
                write!(f, "source {source} has no table {table}")
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnavailable { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl SourceError {
    pub fn unavailable(path: &Path, cause: io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.to_path_buf(),
            cause,
        }
    }

    pub fn corrupt(path: &Path, message: impl fmt::Display) -> Self {
        Self::CorruptContainer {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Classify an I/O error raised while reading through a container.
    ///
    /// Decoders report bad framing as `InvalidData`/`InvalidInput`, and a
    /// stream cut short as `UnexpectedEof`; anything else is the file itself.
    pub fn from_read(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
                Self::corrupt(path, e)
            }
            _ => Self::unavailable(path, e),
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptContainer { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
