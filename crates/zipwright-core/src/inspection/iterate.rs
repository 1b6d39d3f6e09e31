//! Streaming iteration over archive entries.

use std::collections::HashSet;
use std::io::Read;
use std::ops::ControlFlow;
use std::path::Path;

use zip::result::ZipError;

use crate::NameEncoding;
use crate::Result;
use crate::archive::open_archive;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::entry::EntryMetadata;

/// Calls `callback` for every entry, in archive order.
///
/// Each call receives the entry's metadata and a stream of its decompressed
/// content, valid only for that call. Returning [`ControlFlow::Break`] stops
/// the walk without an error.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or an entry cannot be
/// decompressed.
///
/// # Examples
///
/// ```no_run
/// use std::ops::ControlFlow;
/// use zipwright_core::{NameEncoding, iterate};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut total = 0;
/// iterate("bundle.zip", NameEncoding::Auto, |meta, _content| {
///     total += meta.size;
///     ControlFlow::Continue(())
/// })?;
/// println!("{total} bytes uncompressed");
/// # Ok(())
/// # }
/// ```
pub fn iterate<P, F>(source: P, encoding: NameEncoding, mut callback: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&EntryMetadata, &mut dyn Read) -> ControlFlow<()>,
{
    let mut archive = open_archive(source.as_ref())?;

    for index in 0..archive.len() {
        let metadata = EntryMetadata::read(&mut archive, index, encoding)?;
        let mut content = archive.by_index(index)?;
        if callback(&metadata, &mut content).is_break() {
            break;
        }
    }

    Ok(())
}

/// Calls `callback` only for entries whose names are in `names`.
///
/// The archive is scanned once and the walk stops as soon as every requested
/// name has been delivered. Returns `true` if at least one requested name was
/// found.
///
/// # Errors
///
/// See [`iterate`].
pub fn iterate_names<P, I, S, F>(
    source: P,
    names: I,
    encoding: NameEncoding,
    mut callback: F,
) -> Result<bool>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&EntryMetadata, &mut dyn Read) -> ControlFlow<()>,
{
    let mut pending: HashSet<String> = names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();
    if pending.is_empty() {
        return Ok(false);
    }

    let mut found = false;
    iterate(source, encoding, |metadata, content| {
        if !pending.remove(&metadata.name) {
            return ControlFlow::Continue(());
        }
        found = true;
        if callback(metadata, content).is_break() || pending.is_empty() {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    })?;

    Ok(found)
}

/// Returns `true` if the archive has an entry named `name`.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened.
pub fn contains_entry(source: impl AsRef<Path>, name: &str) -> Result<bool> {
    let archive = open_archive(source.as_ref())?;
    Ok(archive.index_for_name(name).is_some())
}

/// Returns every entry name in archive order.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened.
pub fn entry_names(source: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut archive = open_archive(source.as_ref())?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        names.push(archive.by_index_raw(index)?.name().to_string());
    }
    Ok(names)
}

/// Returns the decompressed content of `name`, or `None` if absent.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or the entry cannot be
/// decompressed.
pub fn read_entry(source: impl AsRef<Path>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_archive(source.as_ref())?;
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::new();
    copy_with_buffer(&mut file, &mut data, &mut CopyBuffer::new())?;
    Ok(Some(data))
}

/// Returns the metadata of `name`, or `None` if absent.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened.
pub fn entry_metadata(source: impl AsRef<Path>, name: &str) -> Result<Option<EntryMetadata>> {
    let mut archive = open_archive(source.as_ref())?;
    match archive.index_for_name(name) {
        Some(index) => Ok(Some(EntryMetadata::read(
            &mut archive,
            index,
            NameEncoding::Auto,
        )?)),
        None => Ok(None),
    }
}
