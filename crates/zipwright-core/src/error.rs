//! Error types for archive rewriting, inspection, and extraction.

use std::path::PathBuf;
use thiserror::Error;
use zip::result::ZipError;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while reading, rewriting, or unpacking archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation failed (read, write, rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive or extra-field structure is malformed.
    #[error("malformed archive: {0}")]
    Format(String),

    /// Entry name escapes its containment root (zip-slip).
    #[error("malicious entry {name:?} escapes {root}")]
    MaliciousEntry {
        /// Entry name as stored in the archive.
        name: String,
        /// Root the entry was resolved against.
        root: PathBuf,
    },

    /// Requested capability is not available in this build or platform.
    #[error("unsupported feature: {feature}")]
    Unsupported {
        /// Description of the missing capability.
        feature: String,
    },

    /// Compression level is outside 0-9.
    #[error("invalid compression level {level}, expected 0-9")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u8,
    },

    /// Source archive or input file does not exist.
    #[error("source not found: {path}")]
    SourceNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Timestamp cannot be represented as an MS-DOS date/time.
    #[error("timestamp out of range for ZIP: {year}-{month:02}-{day:02}")]
    InvalidTimestamp {
        /// Calendar year.
        year: i64,
        /// Calendar month (1-12).
        month: u32,
        /// Day of month (1-31).
        day: u32,
    },
}

impl ArchiveError {
    /// Shorthand for a [`ArchiveError::Format`] error.
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Returns `true` if this error represents a security violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipwright_core::ArchiveError;
    /// use std::path::PathBuf;
    ///
    /// let err = ArchiveError::MaliciousEntry {
    ///     name: "../etc/passwd".into(),
    ///     root: PathBuf::from("/tmp/out"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ArchiveError::Format("bad header".into());
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::MaliciousEntry { .. })
    }

    /// Returns `true` if the caller can degrade gracefully instead of failing.
    ///
    /// Only unsupported-feature errors qualify; structural, security, and I/O
    /// failures are never retried.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipwright_core::ArchiveError;
    ///
    /// let err = ArchiveError::Format("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    ///
    /// let err = ArchiveError::InvalidCompressionLevel { level: 12 };
    /// assert_eq!(err.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Format(msg) => Some(msg),
            Self::Unsupported { feature } => Some(feature),
            _ => None,
        }
    }
}

impl From<ZipError> for ArchiveError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => Self::Io(e),
            ZipError::UnsupportedArchive(msg) => Self::Unsupported {
                feature: msg.to_string(),
            },
            other => Self::Format(other.to_string()),
        }
    }
}
