//! Content equality of archives and entries.
//!
//! Timestamps, compression methods and entry order do not take part in the
//! comparison. Two entries are equal when they agree on the directory flag
//! and their decompressed bytes match.

use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

use log::debug;
use zip::ZipArchive;

use crate::NameEncoding;
use crate::Result;
use crate::archive::open_archive;
use crate::copy::CopyBuffer;
use crate::copy::read_up_to;
use crate::entry::EntryMetadata;

/// Returns `true` if both archives hold the same entry names with the same
/// decompressed content.
///
/// # Errors
///
/// Returns an error if either archive cannot be opened or an entry cannot be
/// decompressed.
///
/// # Examples
///
/// ```no_run
/// use zipwright_core::archive_equals;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// if archive_equals("before.zip", "after.zip")? {
///     println!("no content changes");
/// }
/// # Ok(())
/// # }
/// ```
pub fn archive_equals(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool> {
    let mut left = open_archive(a.as_ref())?;
    let mut right = open_archive(b.as_ref())?;

    let left_entries = index_entries(&mut left)?;
    let right_entries = index_entries(&mut right)?;

    if left_entries.len() != right_entries.len() {
        debug!(
            "entry count differs: {} vs {}",
            left_entries.len(),
            right_entries.len()
        );
        return Ok(false);
    }

    for (name, left_meta) in &left_entries {
        let Some(right_meta) = right_entries.get(name) else {
            debug!("{name} missing from second archive");
            return Ok(false);
        };
        if !metadata_equal(&mut left, left_meta, &mut right, right_meta)? {
            debug!("{name} differs");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Returns `true` if entry `name_a` of `a` equals entry `name_b` of `b`.
///
/// Two absent entries are equal; one absent entry is not.
///
/// # Errors
///
/// Returns an error if either archive cannot be opened or an entry cannot be
/// decompressed.
pub fn entry_equals(
    a: impl AsRef<Path>,
    name_a: &str,
    b: impl AsRef<Path>,
    name_b: &str,
) -> Result<bool> {
    let mut left = open_archive(a.as_ref())?;
    let mut right = open_archive(b.as_ref())?;

    match (left.index_for_name(name_a), right.index_for_name(name_b)) {
        (None, None) => Ok(true),
        (Some(_), None) | (None, Some(_)) => Ok(false),
        (Some(left_index), Some(right_index)) => {
            let left_meta = EntryMetadata::read(&mut left, left_index, NameEncoding::Auto)?;
            let right_meta = EntryMetadata::read(&mut right, right_index, NameEncoding::Auto)?;
            metadata_equal(&mut left, &left_meta, &mut right, &right_meta)
        }
    }
}

fn index_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, EntryMetadata>> {
    let mut entries = HashMap::with_capacity(archive.len());
    for index in 0..archive.len() {
        let meta = EntryMetadata::read(archive, index, NameEncoding::Auto)?;
        entries.insert(meta.name.clone(), meta);
    }
    Ok(entries)
}

fn metadata_equal<A, B>(
    left: &mut ZipArchive<A>,
    left_meta: &EntryMetadata,
    right: &mut ZipArchive<B>,
    right_meta: &EntryMetadata,
) -> Result<bool>
where
    A: Read + Seek,
    B: Read + Seek,
{
    if left_meta.is_directory != right_meta.is_directory {
        return Ok(false);
    }
    if left_meta.size != right_meta.size || left_meta.crc32 != right_meta.crc32 {
        return Ok(false);
    }
    if left_meta.is_directory {
        return Ok(true);
    }

    let mut left_file = left.by_index(left_meta.index)?;
    let mut right_file = right.by_index(right_meta.index)?;
    streams_equal(&mut left_file, &mut right_file)
}

/// Compares two streams chunk by chunk.
fn streams_equal(left: &mut dyn Read, right: &mut dyn Read) -> Result<bool> {
    let mut left_buf = CopyBuffer::new();
    let mut right_buf = CopyBuffer::new();

    loop {
        let left_len = read_up_to(left, left_buf.as_mut_slice())?;
        let right_len = read_up_to(right, right_buf.as_mut_slice())?;
        if left_buf.as_mut_slice()[..left_len] != right_buf.as_mut_slice()[..right_len] {
            return Ok(false);
        }
        if left_len == 0 {
            return Ok(true);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::DateTime;

    fn write(temp: &TempDir, name: &str, data: Vec<u8>) -> PathBuf {
        let path = temp.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_streams_equal_across_chunks() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 7) as u8).collect();
        let mut other = data.clone();
        let equal = streams_equal(&mut Cursor::new(data.clone()), &mut Cursor::new(other.clone()));
        assert!(equal.unwrap());

        other[140_000] ^= 1;
        let equal = streams_equal(&mut Cursor::new(data.clone()), &mut Cursor::new(other));
        assert!(!equal.unwrap());

        let equal = streams_equal(&mut Cursor::new(data), &mut Cursor::new(Vec::new()));
        assert!(!equal.unwrap());
    }

    #[test]
    fn test_archive_equals_ignores_timestamps_and_order() {
        let temp = TempDir::new().unwrap();
        let old = DateTime::from_date_and_time(1999, 1, 1, 0, 0, 0).unwrap();
        let new = DateTime::from_date_and_time(2024, 5, 5, 5, 5, 4).unwrap();

        let a = write(
            &temp,
            "a.zip",
            ZipTestBuilder::new()
                .add_file_at("one", b"1", old)
                .add_file_at("two", b"22", old)
                .build(),
        );
        let b = write(
            &temp,
            "b.zip",
            ZipTestBuilder::new()
                .add_file_at("two", b"22", new)
                .add_file_at("one", b"1", new)
                .build(),
        );
        assert!(archive_equals(&a, &b).unwrap());
    }

    #[test]
    fn test_archive_equals_ignores_compression() {
        let temp = TempDir::new().unwrap();
        let body = vec![b'z'; 4096];
        let a = write(&temp, "a.zip", ZipTestBuilder::new().add_file("f", &body).build());
        let b = write(
            &temp,
            "b.zip",
            ZipTestBuilder::new().add_deflated_file("f", &body).build(),
        );
        assert!(archive_equals(&a, &b).unwrap());
    }

    #[test]
    fn test_archive_equals_detects_differences() {
        let temp = TempDir::new().unwrap();
        let single = |name: &str, data: &[u8]| ZipTestBuilder::new().add_file(name, data).build();
        let base = write(&temp, "base.zip", single("f", b"abc"));
        let changed = write(&temp, "changed.zip", single("f", b"abd"));
        let renamed = write(&temp, "renamed.zip", single("g", b"abc"));
        let extra = write(
            &temp,
            "extra.zip",
            ZipTestBuilder::new().add_file("f", b"abc").add_file("h", b"").build(),
        );

        assert!(!archive_equals(&base, &changed).unwrap());
        assert!(!archive_equals(&base, &renamed).unwrap());
        assert!(!archive_equals(&base, &extra).unwrap());
    }

    #[test]
    fn test_directory_flag_matters() {
        let temp = TempDir::new().unwrap();
        let dir = write(&temp, "dir.zip", ZipTestBuilder::new().add_directory("d/").build());
        let file = write(&temp, "file.zip", ZipTestBuilder::new().add_file("d", b"").build());
        assert!(!entry_equals(&dir, "d/", &file, "d").unwrap());
        assert!(entry_equals(&dir, "d/", &dir, "d/").unwrap());
    }

    #[test]
    fn test_entry_equals_absent_entries() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.zip", ZipTestBuilder::new().add_file("x", b"1").build());
        let b = write(&temp, "b.zip", ZipTestBuilder::new().add_file("y", b"1").build());

        assert!(entry_equals(&a, "missing", &b, "also-missing").unwrap());
        assert!(!entry_equals(&a, "x", &b, "missing").unwrap());
        assert!(entry_equals(&a, "x", &b, "y").unwrap());
    }
}
