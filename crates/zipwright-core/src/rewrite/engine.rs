//! Single-pass archive rewrite.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use log::debug;
use log::warn;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipArchive;
use zip::write::FullFileOptions;
use zip::write::ZipWriter;

use super::central::ShadowedEntries;
use super::disposition::Action;
use super::disposition::Disposition;
use super::operation::OperationSet;
use crate::ArchiveError;
use crate::Result;
use crate::RewriteOptions;
use crate::archive::open_archive;
use crate::config::DEFAULT_COMPRESSION_LEVEL;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::entry::EntryMetadata;
use crate::entry::EntrySource;
use crate::entry::OpenedEntry;
use crate::extra;
use crate::extra::ASI_HEADER_ID;
use crate::extra::AsiExtraField;
use crate::extra::ExtraFieldRecord;
use crate::extra::ExtraFieldRegistry;
use crate::io::AtomicFile;
use crate::report::RewriteReport;
use crate::security::validate_entry_name;
use crate::timestamp;

/// Applies `operations` to the archive at `source` in one pass.
///
/// The output goes to `operations.options().destination`, or replaces
/// `source` when no destination is set or the destination is the source
/// file itself. Output is written to a temporary file and renamed into place
/// only after the archive is complete, so a failed rewrite leaves the
/// destination (and, in place, the source) untouched.
///
/// # Errors
///
/// Returns an error if:
/// - Options are invalid (compression level above 9)
/// - The source is missing or not a ZIP archive
/// - An emitted entry name escapes the archive root (zip-slip)
/// - A transformer, entry source or I/O operation fails
///
/// # Examples
///
/// ```no_run
/// use zipwright_core::{EntrySource, OperationSet, RewriteOptions, execute};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let operations = OperationSet::builder()
///     .remove_prefix("build/cache")
///     .replace("config.toml", EntrySource::file("config.toml", "local/config.toml"))
///     .add(EntrySource::bytes("BUILD_ID", b"42\n".to_vec()))
///     .options(RewriteOptions::default().with_destination("release.zip"))
///     .build();
///
/// let report = execute("bundle.zip", operations)?;
/// println!("{} entries written", report.entries_written());
/// # Ok(())
/// # }
/// ```
pub fn execute(source: impl AsRef<Path>, operations: OperationSet) -> Result<RewriteReport> {
    let start = Instant::now();
    let source = source.as_ref();
    let (operations, options) = operations.into_parts();
    options.validate()?;

    let mut archive = open_archive(source)?;
    let mut shadowed = scan_repeated_names(source);
    let (destination, in_place) = resolve_destination(source, options.destination.as_deref());
    let mut writer = EntryWriter::create(&destination, &options)?;
    let mut disposition = Disposition::new(operations);
    let mut report = RewriteReport {
        destination: destination.clone(),
        in_place,
        ..RewriteReport::default()
    };
    let mut shadowed_skipped = 0;

    for index in 0..archive.len() {
        let mut metadata = EntryMetadata::read(&mut archive, index, options.name_encoding)?;

        // The archive index keeps one record per name; the scan has them all
        let occurrences = match shadowed.as_mut() {
            Some(scan) => scan.take(archive.by_index_raw(index)?.name_raw()),
            None => None,
        };
        let first = occurrences.as_ref().and_then(|records| records.first());
        if let Some(record) = first {
            record.overlay(&mut metadata);
        }
        let later = occurrences.as_ref().map_or(0, |records| records.len() - 1);

        match disposition.action(&metadata.name) {
            Action::Remove => {
                debug!("removing {}", metadata.name);
                report.entries_removed += 1 + later;
                continue;
            }
            Action::Transform(transformer) => {
                let mut replacement = match (first, shadowed.as_mut()) {
                    (Some(record), Some(scan)) => {
                        transformer.transform(&metadata, &mut scan.open(record)?)?
                    }
                    _ => transformer.transform(&metadata, &mut archive.by_index(index)?)?,
                };
                let inherited_time = if options.preserve_timestamps {
                    metadata.last_modified
                } else {
                    Some(writer.now)
                };
                replacement.inherit(inherited_time, metadata.permissions);
                if writer.write_source(replacement)? {
                    report.entries_transformed += 1;
                }
            }
            Action::Replace(replacement) => {
                if writer.write_source(replacement)? {
                    report.entries_replaced += 1;
                }
            }
            Action::Copy => {
                let copied = match (first, shadowed.as_mut()) {
                    (Some(record), Some(scan)) => {
                        writer.copy_decoded(&metadata, &mut scan.open(record)?)?
                    }
                    _ => writer.copy_entry(&mut archive, &metadata)?,
                };
                if copied {
                    report.entries_copied += 1;
                }
            }
        }

        if later > 0 {
            debug!("skipping {later} later occurrence(s) of {}", metadata.name);
            shadowed_skipped += later;
        }
    }

    for add in disposition.into_remaining_adds() {
        if writer.write_source(add)? {
            report.entries_added += 1;
        }
    }

    report.duplicates_skipped = writer.duplicates_skipped + shadowed_skipped;
    let output = writer.finish()?;
    drop(shadowed);
    drop(archive);
    output.commit()?;

    report.duration = start.elapsed();
    Ok(report)
}

/// Finds names with more than one central-directory record.
///
/// A scan failure only loses duplicate detection: the archive itself has
/// already been opened by the `zip` reader.
fn scan_repeated_names(source: &Path) -> Option<ShadowedEntries> {
    match ShadowedEntries::scan(source) {
        Ok(scan) if scan.is_empty() => None,
        Ok(scan) => Some(scan),
        Err(e) => {
            warn!("cannot scan central directory of {}: {e}", source.display());
            None
        }
    }
}

/// Writes a new archive at `destination` from `sources`, in order.
///
/// `options.destination` is ignored. Repeated names keep the first
/// occurrence.
///
/// # Errors
///
/// Returns an error if the options are invalid, a name escapes the archive
/// root, or an entry source or I/O operation fails. The destination is left
/// untouched on failure.
///
/// # Examples
///
/// ```
/// use zipwright_core::{EntrySource, RewriteOptions, pack_entries};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let dest = dir.path().join("fresh.zip");
///
/// let report = pack_entries(
///     [
///         EntrySource::directory("docs"),
///         EntrySource::bytes("docs/index.md", b"# Index\n".to_vec()),
///     ],
///     &dest,
///     &RewriteOptions::default(),
/// )?;
/// assert_eq!(report.entries_added, 2);
/// # Ok(())
/// # }
/// ```
pub fn pack_entries(
    sources: impl IntoIterator<Item = EntrySource>,
    destination: impl AsRef<Path>,
    options: &RewriteOptions,
) -> Result<RewriteReport> {
    let start = Instant::now();
    options.validate()?;

    let destination = destination.as_ref();
    let mut writer = EntryWriter::create(destination, options)?;
    let mut report = RewriteReport {
        destination: destination.to_path_buf(),
        ..RewriteReport::default()
    };

    for source in sources {
        if writer.write_source(source)? {
            report.entries_added += 1;
        }
    }

    report.duplicates_skipped = writer.duplicates_skipped;
    writer.finish()?.commit()?;

    report.duration = start.elapsed();
    Ok(report)
}

/// Picks the output path and whether the rewrite is in place.
fn resolve_destination(source: &Path, destination: Option<&Path>) -> (PathBuf, bool) {
    match destination {
        Some(dest) if !is_same_file(source, dest) => (dest.to_path_buf(), false),
        _ => (source.to_path_buf(), true),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Extra-field blocks the ZIP writer derives from entry options.
///
/// Carrying these over from a source entry would duplicate or contradict
/// what the writer emits.
const WRITER_MANAGED_IDS: [u16; 7] = [0x0001, 0x000a, 0x5455, 0x6375, 0x7075, 0x9901, 0xa11e];

/// Header of an entry written through the compressor.
struct EntryHeader {
    last_modified: Option<DateTime>,
    permissions: Option<u32>,
    compression_level: Option<u8>,
    /// Source extra-field blocks to write verbatim. `None` generates an ASi
    /// record from `permissions` instead.
    carried_extra: Option<Vec<ExtraFieldRecord>>,
}

/// Output side of a rewrite: the ZIP writer plus name bookkeeping.
struct EntryWriter {
    zip: ZipWriter<AtomicFile>,
    root: PathBuf,
    now: DateTime,
    preserve_timestamps: bool,
    compression_level: Option<u8>,
    written: HashSet<String>,
    buffer: CopyBuffer,
    duplicates_skipped: usize,
}

impl EntryWriter {
    fn create(destination: &Path, options: &RewriteOptions) -> Result<Self> {
        let output = AtomicFile::create(destination)?;
        Ok(Self {
            zip: ZipWriter::new(output),
            root: destination.to_path_buf(),
            now: timestamp::now(),
            preserve_timestamps: options.preserve_timestamps,
            compression_level: options.compression_level,
            written: HashSet::new(),
            buffer: CopyBuffer::new(),
            duplicates_skipped: 0,
        })
    }

    /// Returns `false` (and counts a skip) if `name` is already written.
    /// Otherwise validates the name and reserves it.
    fn reserve(&mut self, name: &str) -> Result<bool> {
        if self.written.contains(name) {
            debug!("skipping duplicate entry {name}");
            self.duplicates_skipped += 1;
            return Ok(false);
        }
        validate_entry_name(&self.root, name)?;
        self.written.insert(name.to_string());
        Ok(true)
    }

    /// Copies a source entry.
    ///
    /// Entries whose extra field holds blocks the `zip` raw copy would drop
    /// (ASi among them) are decompressed and written again with those blocks.
    /// Everything else keeps its compressed bytes unchanged.
    fn copy_entry<R: Read + Seek>(
        &mut self,
        archive: &mut ZipArchive<R>,
        metadata: &EntryMetadata,
    ) -> Result<bool> {
        if !self.reserve(&metadata.name)? {
            return Ok(false);
        }

        if let Some(header) = self.carried_header(metadata) {
            debug!("re-encoding {} to keep its extra field", metadata.name);
            if metadata.is_directory {
                self.write_directory(&metadata.name, &header)?;
            } else {
                let mut content = archive.by_index(metadata.index)?;
                self.write_file(&metadata.name, &mut content, &header)?;
            }
            return Ok(true);
        }

        let file = archive.by_index_raw(metadata.index)?;
        if self.preserve_timestamps {
            self.zip.raw_copy_file(file)?;
        } else {
            let unix_mode = file.unix_mode();
            self.zip.raw_copy_file_touch(file, self.now, unix_mode)?;
        }
        Ok(true)
    }

    /// Writes a source entry from already decompressed `content`.
    fn copy_decoded<R: Read + ?Sized>(
        &mut self,
        metadata: &EntryMetadata,
        content: &mut R,
    ) -> Result<bool> {
        if !self.reserve(&metadata.name)? {
            return Ok(false);
        }

        let header = self.carried_header(metadata).unwrap_or_else(|| EntryHeader {
            last_modified: self.copied_time(metadata),
            permissions: metadata.permissions,
            compression_level: Some(self.copied_level(metadata)),
            carried_extra: Some(Vec::new()),
        });
        if metadata.is_directory {
            self.write_directory(&metadata.name, &header)?;
        } else {
            self.write_file(&metadata.name, content, &header)?;
        }
        Ok(true)
    }

    /// Header for re-encoding `metadata` with its non-managed extra blocks,
    /// or `None` when there are none or the method cannot be re-encoded.
    fn carried_header(&self, metadata: &EntryMetadata) -> Option<EntryHeader> {
        if !matches!(
            metadata.compression,
            CompressionMethod::Stored | CompressionMethod::Deflated
        ) {
            return None;
        }

        let raw = ExtraFieldRegistry::builder().build();
        let blocks = match extra::parse_with(&raw, metadata.extra.as_deref()?) {
            Ok(blocks) => blocks,
            Err(e) => {
                debug!("copying {} without its extra field: {e}", metadata.name);
                return None;
            }
        };
        let carried: Vec<ExtraFieldRecord> = blocks
            .into_iter()
            .filter(|block| !WRITER_MANAGED_IDS.contains(&block.header_id()))
            .collect();
        if carried.is_empty() {
            return None;
        }

        Some(EntryHeader {
            last_modified: self.copied_time(metadata),
            permissions: metadata.permissions,
            compression_level: Some(self.copied_level(metadata)),
            carried_extra: Some(carried),
        })
    }

    fn copied_time(&self, metadata: &EntryMetadata) -> Option<DateTime> {
        if self.preserve_timestamps {
            metadata.last_modified
        } else {
            None
        }
    }

    /// Keeps stored entries stored.
    fn copied_level(&self, metadata: &EntryMetadata) -> u8 {
        match metadata.compression {
            CompressionMethod::Stored => 0,
            _ => self
                .compression_level
                .filter(|level| *level > 0)
                .unwrap_or(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    /// Compresses and writes a new entry.
    fn write_source(&mut self, source: EntrySource) -> Result<bool> {
        if !self.reserve(source.name())? {
            return Ok(false);
        }

        let OpenedEntry {
            name,
            reader,
            last_modified,
            permissions,
            compression_level,
        } = source.open()?;
        let header = EntryHeader {
            last_modified,
            permissions,
            compression_level,
            carried_extra: None,
        };

        match reader {
            None => self.write_directory(&name, &header)?,
            Some(mut reader) => self.write_file(&name, &mut reader, &header)?,
        }
        Ok(true)
    }

    fn write_directory(&mut self, name: &str, header: &EntryHeader) -> Result<()> {
        let options = self.file_options(header, true)?;
        self.zip.add_directory(name, options)?;
        Ok(())
    }

    fn write_file<R: Read + ?Sized>(
        &mut self,
        name: &str,
        content: &mut R,
        header: &EntryHeader,
    ) -> Result<()> {
        let options = self.file_options(header, false)?;
        self.zip.start_file(name, options)?;
        copy_with_buffer(content, &mut self.zip, &mut self.buffer)?;
        Ok(())
    }

    fn file_options(
        &self,
        header: &EntryHeader,
        is_directory: bool,
    ) -> Result<FullFileOptions<'static>> {
        let level = header.compression_level.or(self.compression_level);
        if let Some(level) = level
            && level > 9
        {
            return Err(ArchiveError::InvalidCompressionLevel { level });
        }

        let options = FullFileOptions::default()
            .last_modified_time(header.last_modified.unwrap_or(self.now));
        let mut options = match level {
            Some(0) => options.compression_method(CompressionMethod::Stored),
            Some(level) => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level))),
            None => options.compression_method(CompressionMethod::Deflated),
        };

        if let Some(mode) = header.permissions {
            options = options.unix_permissions(mode);
        }

        match &header.carried_extra {
            Some(blocks) => {
                for block in blocks {
                    options.add_extra_data(
                        block.header_id(),
                        block.payload().into_boxed_slice(),
                        false,
                    )?;
                }
            }
            None => {
                if let Some(mode) = header.permissions {
                    let asi = if is_directory {
                        AsiExtraField::from_directory_mode(mode)
                    } else {
                        AsiExtraField::from_mode(mode)
                    };
                    options.add_extra_data(ASI_HEADER_ID, asi.encode().into_boxed_slice(), false)?;
                }
            }
        }

        Ok(options)
    }

    fn finish(self) -> Result<AtomicFile> {
        Ok(self.zip.finish()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inspection::entry_metadata;
    use crate::inspection::entry_names;
    use crate::inspection::read_entry;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::create_raw_zip;
    use tempfile::TempDir;

    fn source_archive(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("source.zip");
        let data = ZipTestBuilder::new()
            .add_file("keep.txt", b"keep")
            .add_file("drop.txt", b"drop")
            .add_file("swap.txt", b"old")
            .build();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_resolve_destination() {
        let temp = TempDir::new().unwrap();
        let source = source_archive(&temp);
        let other = temp.path().join("other.zip");

        assert_eq!(resolve_destination(&source, None), (source.clone(), true));
        assert_eq!(
            resolve_destination(&source, Some(other.as_path())),
            (other.clone(), false)
        );

        let dotted = temp.path().join(".").join("source.zip");
        assert_eq!(
            resolve_destination(&source, Some(dotted.as_path())),
            (source.clone(), true)
        );
    }

    #[test]
    fn test_execute_in_place() {
        let temp = TempDir::new().unwrap();
        let source = source_archive(&temp);

        let operations = OperationSet::builder()
            .remove("drop.txt")
            .replace("swap.txt", EntrySource::bytes("swap.txt", b"new".to_vec()))
            .add(EntrySource::bytes("added.txt", b"added".to_vec()))
            .build();
        let report = execute(&source, operations).unwrap();

        assert!(report.in_place);
        assert_eq!(report.entries_copied, 1);
        assert_eq!(report.entries_removed, 1);
        assert_eq!(report.entries_replaced, 1);
        assert_eq!(report.entries_added, 1);
        assert_eq!(
            entry_names(&source).unwrap(),
            vec!["keep.txt", "swap.txt", "added.txt"]
        );
        assert_eq!(read_entry(&source, "swap.txt").unwrap().unwrap(), b"new");
    }

    #[test]
    fn test_new_entries_carry_permissions() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("perm.zip");
        pack_entries(
            [
                EntrySource::bytes("suid", b"x".to_vec()).with_permissions(0o4755),
                EntrySource::directory("dir").with_permissions(0o750),
                EntrySource::bytes("plain", b"y".to_vec()),
            ],
            &dest,
            &RewriteOptions::default(),
        )
        .unwrap();

        let suid = entry_metadata(&dest, "suid").unwrap().unwrap();
        assert_eq!(suid.permissions, Some(0o4755));
        assert_eq!(suid.compression, CompressionMethod::Deflated);

        let dir = entry_metadata(&dest, "dir/").unwrap().unwrap();
        assert!(dir.is_directory);
        assert_eq!(dir.permissions, Some(0o750));
        assert!(dir.asi().unwrap().is_directory());
    }

    #[test]
    fn test_compression_level_zero_stores() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("stored.zip");
        pack_entries(
            [
                EntrySource::bytes("a", vec![b'a'; 1000]),
                EntrySource::bytes("b", vec![b'b'; 1000]).with_compression_level(9),
            ],
            &dest,
            &RewriteOptions::default().with_compression_level(0),
        )
        .unwrap();

        let a = entry_metadata(&dest, "a").unwrap().unwrap();
        assert_eq!(a.compression, CompressionMethod::Stored);
        let b = entry_metadata(&dest, "b").unwrap().unwrap();
        assert_eq!(b.compression, CompressionMethod::Deflated);
    }

    #[test]
    fn test_invalid_entry_level_leaves_no_output() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("bad.zip");
        let err = pack_entries(
            [EntrySource::bytes("a", Vec::new()).with_compression_level(12)],
            &dest,
            &RewriteOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ArchiveError::InvalidCompressionLevel { level: 12 }
        ));
        assert!(!dest.exists());
    }

    #[test]
    fn test_pack_entries_dedupes() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dups.zip");
        let report = pack_entries(
            [
                EntrySource::bytes("same", b"first".to_vec()),
                EntrySource::bytes("same", b"second".to_vec()),
            ],
            &dest,
            &RewriteOptions::default(),
        )
        .unwrap();

        assert_eq!(report.entries_added, 1);
        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(read_entry(&dest, "same").unwrap().unwrap(), b"first");
    }

    #[test]
    fn test_copy_keeps_asi_record() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("modes.zip");
        fs::write(
            &source,
            ZipTestBuilder::new()
                .add_file_with_asi("bin/tool", b"#!/bin/sh\n", 0o4750)
                .add_file("plain.txt", b"plain")
                .build(),
        )
        .unwrap();
        let dest = temp.path().join("copy.zip");

        let report = execute(&source, OperationSet::builder().destination(&dest).build()).unwrap();
        assert_eq!(report.entries_copied, 2);

        let tool = entry_metadata(&dest, "bin/tool").unwrap().unwrap();
        assert_eq!(tool.permissions, Some(0o4750));
        assert_eq!(tool.asi().unwrap().to_mode(), 0o4750);
        assert_eq!(tool.compression, CompressionMethod::Stored);
        assert_eq!(read_entry(&dest, "bin/tool").unwrap().unwrap(), b"#!/bin/sh\n");

        let plain = entry_metadata(&dest, "plain.txt").unwrap().unwrap();
        assert!(plain.asi().is_none());
        assert_eq!(plain.permissions, Some(0o644));
    }

    #[test]
    fn test_removing_repeated_name_counts_every_record() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dups.zip");
        fs::write(
            &source,
            create_raw_zip(&[("x", b"one"), ("y", b"y"), ("x", b"two"), ("x", b"three")]),
        )
        .unwrap();

        let report = execute(&source, OperationSet::builder().remove("x").build()).unwrap();
        assert_eq!(report.entries_removed, 3);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(entry_names(&source).unwrap(), vec!["y"]);
    }

    #[test]
    fn test_repeated_name_copies_first_record() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dups.zip");
        fs::write(
            &source,
            create_raw_zip(&[("x", b"one"), ("x", b"two"), ("x", b"three")]),
        )
        .unwrap();
        let dest = temp.path().join("clean.zip");

        let report = execute(&source, OperationSet::builder().destination(&dest).build()).unwrap();
        assert_eq!(report.entries_copied, 1);
        assert_eq!(report.duplicates_skipped, 2);
        assert_eq!(read_entry(&dest, "x").unwrap().unwrap(), b"one");

        let x = entry_metadata(&dest, "x").unwrap().unwrap();
        assert_eq!(x.compression, CompressionMethod::Stored);
        assert_eq!(x.permissions, Some(0o644));
    }

    #[test]
    fn test_carried_extra_drops_writer_managed_blocks() {
        let temp = TempDir::new().unwrap();
        let writer = EntryWriter::create(&temp.path().join("out.zip"), &RewriteOptions::default())
            .unwrap();

        let records = vec![
            ExtraFieldRecord::Unrecognized {
                header_id: 0x5455,
                data: vec![1, 0x10, 0x20, 0x30, 0x40],
            },
            ExtraFieldRecord::Unrecognized {
                header_id: ASI_HEADER_ID,
                data: AsiExtraField::from_mode(0o700).encode(),
            },
        ];
        let mut metadata = EntryMetadata {
            name: "tool".into(),
            index: 0,
            is_directory: false,
            last_modified: None,
            compression: CompressionMethod::Deflated,
            size: 0,
            compressed_size: 0,
            crc32: 0,
            permissions: Some(0o700),
            extra: Some(extra::serialize(&records).unwrap()),
        };

        let header = writer.carried_header(&metadata).unwrap();
        let ids: Vec<u16> = header
            .carried_extra
            .unwrap()
            .iter()
            .map(ExtraFieldRecord::header_id)
            .collect();
        assert_eq!(ids, vec![ASI_HEADER_ID]);
        assert_eq!(header.compression_level, Some(DEFAULT_COMPRESSION_LEVEL));
        assert_eq!(header.last_modified, None);

        metadata.extra = Some(extra::serialize(&records[..1]).unwrap());
        assert!(writer.carried_header(&metadata).is_none());

        metadata.compression = CompressionMethod::Stored;
        metadata.extra = Some(extra::serialize(&records[1..]).unwrap());
        assert_eq!(
            writer.carried_header(&metadata).unwrap().compression_level,
            Some(0)
        );
    }
}
