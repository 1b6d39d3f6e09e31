//! Direct central-directory scan for repeated entry names.
//!
//! `ZipArchive` indexes entries by name, so when several central-directory
//! records share a name it exposes only one of them. The rewrite pass needs
//! every occurrence: the first one is emitted and the rest are counted as
//! skipped duplicates. This module reads the records itself and opens the
//! content of any one of them.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use flate2::read::DeflateDecoder;
use zip::CompressionMethod;
use zip::DateTime;

use crate::ArchiveError;
use crate::Result;
use crate::archive::open_source;
use crate::entry::EntryMetadata;
use crate::entry::metadata::asi_permissions;
use crate::extra;
use crate::extra::ExtraFieldRecord;
use crate::extra::ExtraFieldRegistry;
use crate::extra::PERMISSION_MASK;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_LEN: usize = 22;
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: u64 = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_EOCD_LEN: usize = 56;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
const LOCAL_HEADER_LEN: usize = 30;
const ZIP64_EXTRA_ID: u16 = 0x0001;
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;
const FLAG_ENCRYPTED: u16 = 1;
const HOST_UNIX: u16 = 3;

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// One central-directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CentralRecord {
    pub(crate) name: Vec<u8>,
    version_made_by: u16,
    flags: u16,
    method: u16,
    dos_time: u16,
    dos_date: u16,
    crc32: u32,
    compressed_size: u64,
    size: u64,
    external_attributes: u32,
    extra: Vec<u8>,
    local_header_offset: u64,
}

impl CentralRecord {
    fn is_directory(&self) -> bool {
        self.name.ends_with(b"/")
    }

    fn compression_method(&self) -> Option<CompressionMethod> {
        match self.method {
            METHOD_STORED => Some(CompressionMethod::Stored),
            METHOD_DEFLATED => Some(CompressionMethod::Deflated),
            _ => None,
        }
    }

    fn permissions(&self, name: &str) -> Option<u32> {
        if let Some(mode) = asi_permissions(name, &self.extra) {
            return Some(mode);
        }
        let mode = self.external_attributes >> 16;
        (self.version_made_by >> 8 == HOST_UNIX && mode != 0).then_some(mode & PERMISSION_MASK)
    }

    /// Replaces the header fields of `metadata` with this record's.
    ///
    /// The name and index stay, since they identify the entry in the
    /// collapsed `ZipArchive` view.
    pub(crate) fn overlay(&self, metadata: &mut EntryMetadata) {
        metadata.is_directory = self.is_directory();
        metadata.last_modified = DateTime::try_from_msdos(self.dos_date, self.dos_time).ok();
        if let Some(method) = self.compression_method() {
            metadata.compression = method;
        }
        metadata.size = self.size;
        metadata.compressed_size = self.compressed_size;
        metadata.crc32 = self.crc32;
        metadata.permissions = self.permissions(&metadata.name);
        metadata.extra = (!self.extra.is_empty()).then(|| self.extra.clone());
    }
}

/// Entry names that occur more than once, with every record for each.
pub(crate) struct ShadowedEntries {
    reader: BufReader<File>,
    groups: HashMap<Vec<u8>, Vec<CentralRecord>>,
}

impl ShadowedEntries {
    /// Scans the central directory of the archive at `path`.
    pub(crate) fn scan(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(open_source(path)?);
        let records = read_central_directory(&mut reader)?;

        let mut groups: HashMap<Vec<u8>, Vec<CentralRecord>> = HashMap::new();
        for record in records {
            groups.entry(record.name.clone()).or_default().push(record);
        }
        groups.retain(|_, records| records.len() > 1);

        Ok(Self { reader, groups })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Removes and returns every record named `raw_name`, in directory
    /// order, if the name is repeated.
    pub(crate) fn take(&mut self, raw_name: &[u8]) -> Option<Vec<CentralRecord>> {
        self.groups.remove(raw_name)
    }

    /// Opens the decompressed content of `record`.
    pub(crate) fn open(&mut self, record: &CentralRecord) -> Result<Box<dyn Read + '_>> {
        if record.flags & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::Unsupported {
                feature: format!(
                    "encrypted entry {}",
                    String::from_utf8_lossy(&record.name)
                ),
            });
        }

        self.reader.seek(SeekFrom::Start(record.local_header_offset))?;
        let mut header = [0u8; LOCAL_HEADER_LEN];
        self.reader.read_exact(&mut header)?;
        if le_u32(&header, 0) != LOCAL_SIGNATURE {
            return Err(ArchiveError::format(format!(
                "no local header at offset {}",
                record.local_header_offset
            )));
        }
        let skip = i64::from(le_u16(&header, 26)) + i64::from(le_u16(&header, 28));
        self.reader.seek_relative(skip)?;

        let data = (&mut self.reader).take(record.compressed_size);
        match record.method {
            METHOD_STORED => Ok(Box::new(data)),
            METHOD_DEFLATED => Ok(Box::new(DeflateDecoder::new(data))),
            method => Err(ArchiveError::Unsupported {
                feature: format!("compression method {method}"),
            }),
        }
    }
}

/// Reads every central-directory record, in order, duplicates included.
pub(crate) fn read_central_directory<R: Read + Seek>(reader: &mut R) -> Result<Vec<CentralRecord>> {
    let (eocd_pos, eocd) = find_end_of_central_directory(reader)?;
    let mut count = u64::from(le_u16(&eocd, 10));
    let mut cd_size = u64::from(le_u32(&eocd, 12));
    let mut cd_offset = u64::from(le_u32(&eocd, 16));
    let mut directory_end = eocd_pos;

    if count == u64::from(u16::MAX)
        || cd_size == u64::from(u32::MAX)
        || cd_offset == u64::from(u32::MAX)
    {
        let zip64 = read_zip64_end(reader, eocd_pos)?;
        count = le_u64(&zip64.1, 32);
        cd_size = le_u64(&zip64.1, 40);
        cd_offset = le_u64(&zip64.1, 48);
        directory_end = zip64.0;
    }

    // Bytes prepended to the archive shift every stored offset
    let cd_start = directory_end
        .checked_sub(cd_size)
        .ok_or_else(|| ArchiveError::format("central directory larger than archive"))?;
    let base = cd_start.saturating_sub(cd_offset);

    let len = usize::try_from(cd_size)
        .map_err(|_| ArchiveError::format("central directory too large"))?;
    let mut directory = vec![0u8; len];
    reader.seek(SeekFrom::Start(cd_start))?;
    reader.read_exact(&mut directory)?;

    let mut records = Vec::new();
    let mut rest = directory.as_slice();
    for _ in 0..count {
        if rest.len() < CENTRAL_HEADER_LEN || le_u32(rest, 0) != CENTRAL_SIGNATURE {
            return Err(ArchiveError::format("truncated central directory"));
        }
        let name_len = usize::from(le_u16(rest, 28));
        let extra_len = usize::from(le_u16(rest, 30));
        let comment_len = usize::from(le_u16(rest, 32));
        let record_len = CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
        if rest.len() < record_len {
            return Err(ArchiveError::format("truncated central directory record"));
        }

        let name_end = CENTRAL_HEADER_LEN + name_len;
        let extra = rest[name_end..name_end + extra_len].to_vec();
        let mut record = CentralRecord {
            name: rest[CENTRAL_HEADER_LEN..name_end].to_vec(),
            version_made_by: le_u16(rest, 4),
            flags: le_u16(rest, 8),
            method: le_u16(rest, 10),
            dos_time: le_u16(rest, 12),
            dos_date: le_u16(rest, 14),
            crc32: le_u32(rest, 16),
            compressed_size: u64::from(le_u32(rest, 20)),
            size: u64::from(le_u32(rest, 24)),
            external_attributes: le_u32(rest, 38),
            local_header_offset: u64::from(le_u32(rest, 42)),
            extra,
        };
        apply_zip64_extra(&mut record)?;
        record.local_header_offset += base;

        records.push(record);
        rest = &rest[record_len..];
    }

    Ok(records)
}

fn find_end_of_central_directory<R: Read + Seek>(reader: &mut R) -> Result<(u64, Vec<u8>)> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let window = file_len.min(EOCD_LEN as u64 + MAX_COMMENT_LEN);
    let window_start = file_len - window;

    let mut tail = vec![0u8; usize::try_from(window).unwrap_or(0)];
    reader.seek(SeekFrom::Start(window_start))?;
    reader.read_exact(&mut tail)?;

    let position = (0..=tail.len().saturating_sub(EOCD_LEN))
        .rev()
        .find(|&at| tail.len() >= at + EOCD_LEN && le_u32(&tail, at) == EOCD_SIGNATURE)
        .ok_or_else(|| ArchiveError::format("end of central directory not found"))?;

    Ok((
        window_start + position as u64,
        tail[position..position + EOCD_LEN].to_vec(),
    ))
}

fn read_zip64_end<R: Read + Seek>(reader: &mut R, eocd_pos: u64) -> Result<(u64, Vec<u8>)> {
    let locator_pos = eocd_pos
        .checked_sub(ZIP64_LOCATOR_LEN)
        .ok_or_else(|| ArchiveError::format("missing zip64 locator"))?;
    let mut locator = [0u8; ZIP64_LOCATOR_LEN as usize];
    reader.seek(SeekFrom::Start(locator_pos))?;
    reader.read_exact(&mut locator)?;
    if le_u32(&locator, 0) != ZIP64_LOCATOR_SIGNATURE {
        return Err(ArchiveError::format("missing zip64 locator"));
    }

    // Prepended bytes shift the record away from its declared offset
    let declared = le_u64(&locator, 8);
    let adjacent = locator_pos.checked_sub(ZIP64_EOCD_LEN as u64);
    for candidate in [Some(declared), adjacent].into_iter().flatten() {
        let mut end = vec![0u8; ZIP64_EOCD_LEN];
        reader.seek(SeekFrom::Start(candidate))?;
        if reader.read_exact(&mut end).is_ok() && le_u32(&end, 0) == ZIP64_EOCD_SIGNATURE {
            return Ok((candidate, end));
        }
    }
    Err(ArchiveError::format("bad zip64 end record"))
}

/// Replaces saturated 32-bit fields with their zip64 values.
fn apply_zip64_extra(record: &mut CentralRecord) -> Result<()> {
    let saturated = u64::from(u32::MAX);
    if record.size != saturated
        && record.compressed_size != saturated
        && record.local_header_offset != saturated
    {
        return Ok(());
    }

    let raw = ExtraFieldRegistry::builder().build();
    let blocks = extra::parse_with(&raw, &record.extra)?;
    let Some(data) = blocks.iter().find_map(|block| match block {
        ExtraFieldRecord::Unrecognized { header_id, data } if *header_id == ZIP64_EXTRA_ID => {
            Some(data)
        }
        _ => None,
    }) else {
        return Err(ArchiveError::format("zip64 sizes without zip64 extra field"));
    };

    let mut at = 0;
    for field in [
        &mut record.size,
        &mut record.compressed_size,
        &mut record.local_header_offset,
    ] {
        if *field == saturated {
            if data.len() < at + 8 {
                return Err(ArchiveError::format("truncated zip64 extra field"));
            }
            *field = le_u64(data, at);
            at += 8;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::create_raw_zip;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn read_all(mut reader: impl Read) -> Vec<u8> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_records_keep_every_occurrence() {
        let data = create_raw_zip(&[("dup.txt", b"first"), ("b.txt", b"b"), ("dup.txt", b"second")]);
        let records = read_central_directory(&mut Cursor::new(data)).unwrap();

        let names: Vec<&[u8]> = records.iter().map(|r| r.name.as_slice()).collect();
        assert_eq!(names, vec![&b"dup.txt"[..], b"b.txt", b"dup.txt"]);
        assert_eq!(records[0].size, 5);
        assert_eq!(records[2].size, 6);
    }

    #[test]
    fn test_offsets_follow_prepended_bytes() {
        let mut data = b"#!/bin/sh\nexit 0\n".to_vec();
        data.extend(create_raw_zip(&[("a", b"aa"), ("a", b"bbb")]));
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sfx.zip");
        fs::write(&path, data).unwrap();

        let mut shadowed = ShadowedEntries::scan(&path).unwrap();
        let records = shadowed.take(b"a").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(read_all(shadowed.open(&records[0]).unwrap()), b"aa");
        assert_eq!(read_all(shadowed.open(&records[1]).unwrap()), b"bbb");
        assert!(shadowed.is_empty());
    }

    #[test]
    fn test_unique_names_leave_nothing_shadowed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.zip");
        fs::write(
            &path,
            ZipTestBuilder::new()
                .add_file("a", b"a")
                .add_directory("d/")
                .build(),
        )
        .unwrap();

        assert!(ShadowedEntries::scan(&path).unwrap().is_empty());
    }

    #[test]
    fn test_deflated_record_decompresses() {
        let body = vec![b'z'; 4096];
        let data = ZipTestBuilder::new()
            .add_deflated_file("z.txt", &body)
            .build();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deflated.zip");
        fs::write(&path, &data).unwrap();

        let records = read_central_directory(&mut Cursor::new(data)).unwrap();
        assert_eq!(records[0].compression_method(), Some(CompressionMethod::Deflated));

        let mut shadowed = ShadowedEntries::scan(&path).unwrap();
        assert_eq!(read_all(shadowed.open(&records[0]).unwrap()), body);
    }

    #[test]
    fn test_overlay_takes_record_fields() {
        let data = create_raw_zip(&[("x", b"12345")]);
        let record = read_central_directory(&mut Cursor::new(data))
            .unwrap()
            .remove(0);
        let mut metadata = EntryMetadata {
            name: "x".into(),
            index: 0,
            is_directory: false,
            last_modified: None,
            compression: CompressionMethod::Deflated,
            size: 0,
            compressed_size: 0,
            crc32: 0,
            permissions: None,
            extra: None,
        };

        record.overlay(&mut metadata);
        assert_eq!(metadata.size, 5);
        assert_eq!(metadata.compression, CompressionMethod::Stored);
        assert_eq!(metadata.permissions, Some(0o644));
        assert!(metadata.last_modified.is_some());
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_central_directory(&mut Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, ArchiveError::Format(_)));
    }
}
