//! Content providers for new archive entries.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::path::PathBuf;

use zip::DateTime;

use crate::ArchiveError;
use crate::Result;
use crate::archive::open_source;
use crate::extra::PERMISSION_MASK;
use crate::timestamp;

/// Where an entry's bytes come from.
pub enum EntryContent {
    /// In-memory bytes.
    Bytes(Vec<u8>),
    /// A file on disk, opened when the entry is written.
    File(PathBuf),
    /// An arbitrary reader, drained when the entry is written.
    Stream(Box<dyn Read>),
    /// A directory entry with no content.
    Directory,
}

impl fmt::Debug for EntryContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Directory => f.write_str("Directory"),
        }
    }
}

/// A new entry to write into an archive.
///
/// An `EntrySource` is single-use: writing it consumes the content.
///
/// # Examples
///
/// ```
/// use zipwright_core::EntrySource;
///
/// let readme = EntrySource::bytes("README.md", b"# hello\n".to_vec())
///     .with_permissions(0o644)
///     .with_compression_level(9);
/// assert_eq!(readme.name(), "README.md");
///
/// let dir = EntrySource::directory("docs");
/// assert_eq!(dir.name(), "docs/");
/// assert!(dir.is_directory());
/// ```
#[derive(Debug)]
pub struct EntrySource {
    name: String,
    content: EntryContent,
    last_modified: Option<DateTime>,
    permissions: Option<u32>,
    compression_level: Option<u8>,
}

impl EntrySource {
    fn new(name: String, content: EntryContent) -> Self {
        Self {
            name,
            content,
            last_modified: None,
            permissions: None,
            compression_level: None,
        }
    }

    /// Creates an entry from in-memory bytes.
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name.into(), EntryContent::Bytes(data.into()))
    }

    /// Creates an entry whose content is read from a file.
    ///
    /// Unless overridden, the entry takes the file's modification time and,
    /// on Unix, its permission bits.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name.into(), EntryContent::File(path.into()))
    }

    /// Creates an entry whose content is drained from a reader.
    pub fn stream(name: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self::new(name.into(), EntryContent::Stream(Box::new(reader)))
    }

    /// Creates a directory entry. A trailing `/` is added if missing.
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self::new(name, EntryContent::Directory)
    }

    /// Overrides the entry timestamp.
    #[must_use]
    pub fn with_last_modified(mut self, time: DateTime) -> Self {
        self.last_modified = Some(time);
        self
    }

    /// Overrides the permission bits. Bits outside `0o7777` are dropped.
    #[must_use]
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode & PERMISSION_MASK);
        self
    }

    /// Overrides the compression level (0 stores, 1-9 deflates).
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Renames the entry.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for directory entries.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.content, EntryContent::Directory)
    }

    /// Returns the timestamp override.
    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime> {
        self.last_modified
    }

    /// Returns the permission override.
    #[must_use]
    pub fn permissions(&self) -> Option<u32> {
        self.permissions
    }

    /// Returns the compression level override.
    #[must_use]
    pub fn compression_level(&self) -> Option<u8> {
        self.compression_level
    }

    /// Returns the content provider.
    #[must_use]
    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    /// Fills the timestamp and permissions where no override is set.
    pub(crate) fn inherit(&mut self, last_modified: Option<DateTime>, permissions: Option<u32>) {
        if self.last_modified.is_none() {
            self.last_modified = last_modified;
        }
        if self.permissions.is_none() {
            self.permissions = permissions;
        }
    }

    /// Opens the content, consuming the source.
    ///
    /// File content fills unset timestamp and permission overrides from the
    /// file's own metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::SourceNotFound`] if a file source is missing.
    pub fn open(self) -> Result<OpenedEntry> {
        let Self {
            name,
            content,
            mut last_modified,
            mut permissions,
            compression_level,
        } = self;

        let reader: Option<Box<dyn Read>> = match content {
            EntryContent::Bytes(bytes) => Some(Box::new(Cursor::new(bytes))),
            EntryContent::Stream(reader) => Some(reader),
            EntryContent::Directory => None,
            EntryContent::File(path) => {
                let file = open_source(&path)?;
                let metadata = file.metadata()?;
                if metadata.is_dir() {
                    return Err(ArchiveError::Unsupported {
                        feature: format!(
                            "directory {} as file content of {name}",
                            path.display()
                        ),
                    });
                }
                if last_modified.is_none() {
                    last_modified = file_timestamp(&metadata);
                }
                if permissions.is_none() {
                    permissions = file_permissions(&metadata);
                }
                Some(Box::new(file))
            }
        };

        Ok(OpenedEntry {
            name,
            reader,
            last_modified,
            permissions,
            compression_level,
        })
    }
}

/// An entry whose content is ready to be streamed.
pub struct OpenedEntry {
    /// Entry name.
    pub name: String,
    /// Content reader; `None` for directories.
    pub reader: Option<Box<dyn Read>>,
    /// Timestamp to write, if known.
    pub last_modified: Option<DateTime>,
    /// Permission bits to write, if known.
    pub permissions: Option<u32>,
    /// Compression level override.
    pub compression_level: Option<u8>,
}

impl fmt::Debug for OpenedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedEntry")
            .field("name", &self.name)
            .field("is_directory", &self.reader.is_none())
            .field("last_modified", &self.last_modified)
            .field("permissions", &self.permissions)
            .field("compression_level", &self.compression_level)
            .finish()
    }
}

fn file_timestamp(metadata: &fs::Metadata) -> Option<DateTime> {
    metadata
        .modified()
        .ok()
        .and_then(|time| timestamp::from_system_time(time).ok())
}

#[cfg(unix)]
fn file_permissions(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & PERMISSION_MASK)
}

#[cfg(not(unix))]
fn file_permissions(_metadata: &fs::Metadata) -> Option<u32> {
    None
}
