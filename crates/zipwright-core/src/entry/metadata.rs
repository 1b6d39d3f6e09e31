//! Immutable snapshot of one archive entry's header.

use std::io::Read;
use std::io::Seek;

use log::debug;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipArchive;

use crate::NameEncoding;
use crate::Result;
use crate::extra;
use crate::extra::PERMISSION_MASK;

/// Header fields of an archive entry.
///
/// Built from the central directory without decompressing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry name, `/`-separated. Directory names end with `/`.
    pub name: String,

    /// Position in the central directory.
    pub index: usize,

    /// `true` for directory entries.
    pub is_directory: bool,

    /// Last-modified timestamp, if the header carries a valid one.
    pub last_modified: Option<DateTime>,

    /// Compression method of the stored data.
    pub compression: CompressionMethod,

    /// Uncompressed size in bytes.
    pub size: u64,

    /// Compressed size in bytes.
    pub compressed_size: u64,

    /// CRC32 of the uncompressed data.
    pub crc32: u32,

    /// Permission bits (`0..=0o7777`), from the ASi extra field when present,
    /// otherwise from the Unix external attributes.
    pub permissions: Option<u32>,

    /// Raw extra-field bytes, if any.
    pub extra: Option<Vec<u8>>,
}

impl EntryMetadata {
    /// Reads the metadata of the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the header cannot be
    /// read.
    pub fn read<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        index: usize,
        encoding: NameEncoding,
    ) -> Result<Self> {
        let file = archive.by_index_raw(index)?;

        let name = match encoding {
            NameEncoding::Auto => file.name().to_string(),
            NameEncoding::Utf8 => String::from_utf8_lossy(file.name_raw()).into_owned(),
        };

        let extra = file
            .extra_data()
            .filter(|data| !data.is_empty())
            .map(<[u8]>::to_vec);

        let permissions = extra
            .as_deref()
            .and_then(|data| asi_permissions(&name, data))
            .or_else(|| file.unix_mode().map(|mode| mode & PERMISSION_MASK));

        Ok(Self {
            is_directory: file.is_dir(),
            last_modified: file.last_modified(),
            compression: file.compression(),
            size: file.size(),
            compressed_size: file.compressed_size(),
            crc32: file.crc32(),
            permissions,
            extra,
            index,
            name,
        })
    }

    /// Returns the decoded extra-field records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ArchiveError::Format`] if the extra field is
    /// malformed.
    pub fn extra_records(&self) -> Result<Vec<extra::ExtraFieldRecord>> {
        self.extra.as_deref().map_or_else(|| Ok(Vec::new()), extra::parse)
    }

    /// Returns the ASi record of this entry, if one is present and valid.
    #[must_use]
    pub fn asi(&self) -> Option<extra::AsiExtraField> {
        let records = self.extra_records().ok()?;
        extra::find_permission(&records).cloned()
    }
}

/// Permission bits from the ASi block of an extra field.
///
/// A malformed extra field is not fatal here: the entry falls back to its
/// external attributes.
pub(crate) fn asi_permissions(name: &str, data: &[u8]) -> Option<u32> {
    match extra::parse(data) {
        Ok(records) => extra::find_permission(&records).map(extra::AsiExtraField::to_mode),
        Err(e) => {
            debug!("ignoring unreadable extra field of {name}: {e}");
            None
        }
    }
}
