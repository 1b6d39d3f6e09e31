//! Configuration for rewrite and unpack operations.

use std::path::PathBuf;

use crate::ArchiveError;
use crate::Result;

/// How entry names are decoded from raw archive bytes.
///
/// The default, [`NameEncoding::Auto`], honours the per-entry UTF-8 flag
/// (general purpose bit 11) and falls back to CP437 when it is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameEncoding {
    /// UTF-8 when the entry says so, CP437 otherwise.
    #[default]
    Auto,
    /// Always treat raw name bytes as UTF-8 (invalid sequences replaced).
    ///
    /// Useful for archives produced by tools that write UTF-8 names without
    /// setting the language-encoding flag.
    Utf8,
}

/// Options for a rewrite pass.
///
/// # Examples
///
/// ```
/// use zipwright_core::RewriteOptions;
///
/// // In-place update keeping original timestamps
/// let options = RewriteOptions::default().with_preserve_timestamps(true);
/// assert!(options.destination.is_none());
///
/// // Write to a new archive, storing new entries uncompressed
/// let options = RewriteOptions::default()
///     .with_destination("out.zip")
///     .with_compression_level(0);
/// assert_eq!(options.compression_level, Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Destination archive. `None` (or the source path itself) means the
    /// source is updated in place.
    ///
    /// Default: `None`.
    pub destination: Option<PathBuf>,

    /// Keep the original timestamps of copied entries.
    ///
    /// When `false`, copied and transformed entries are stamped with the
    /// rewrite time.
    ///
    /// Default: `false`.
    pub preserve_timestamps: bool,

    /// Name decoding used while reading the source archive.
    ///
    /// Default: [`NameEncoding::Auto`].
    pub name_encoding: NameEncoding,

    /// Compression level for newly written entries.
    ///
    /// `Some(0)` stores entries uncompressed, `Some(1..=9)` deflates them,
    /// `None` uses the deflate default. Copied entries always keep their
    /// original compression.
    ///
    /// Default: `Some(6)`.
    pub compression_level: Option<u8>,
}

/// Deflate level used when no explicit level applies.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            destination: None,
            preserve_timestamps: false,
            name_encoding: NameEncoding::Auto,
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
        }
    }
}

impl RewriteOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the destination archive path.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets whether copied entries keep their timestamps.
    #[must_use]
    pub fn with_preserve_timestamps(mut self, preserve: bool) -> Self {
        self.preserve_timestamps = preserve;
        self
    }

    /// Sets the name encoding used for the source archive.
    #[must_use]
    pub fn with_name_encoding(mut self, encoding: NameEncoding) -> Self {
        self.name_encoding = encoding;
        self
    }

    /// Sets the compression level for new entries.
    ///
    /// Out-of-range levels are reported by [`RewriteOptions::validate`].
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidCompressionLevel`] if the level is
    /// above 9.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.compression_level
            && level > 9
        {
            return Err(ArchiveError::InvalidCompressionLevel { level });
        }
        Ok(())
    }
}

/// Options for unpacking an archive to a directory.
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Apply Unix permission bits stored in the archive.
    ///
    /// Ignored (with a warning) on non-Unix platforms.
    ///
    /// Default: `true`.
    pub preserve_permissions: bool,

    /// Name decoding used while reading the archive.
    ///
    /// Default: [`NameEncoding::Auto`].
    pub name_encoding: NameEncoding,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            preserve_permissions: true,
            name_encoding: NameEncoding::Auto,
        }
    }
}

impl UnpackOptions {
    /// Sets whether permissions are restored.
    #[must_use]
    pub fn with_preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets the name encoding.
    #[must_use]
    pub fn with_name_encoding(mut self, encoding: NameEncoding) -> Self {
        self.name_encoding = encoding;
        self
    }
}
