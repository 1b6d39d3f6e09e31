//! Path-checked extraction of archive entries.

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use log::debug;
use log::warn;
use zip::result::ZipError;

use crate::ArchiveError;
use crate::Result;
use crate::UnpackOptions;
use crate::archive::open_archive;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::entry::EntryMetadata;
use crate::report::UnpackReport;
use crate::types::SafePath;

/// One entry scheduled for extraction.
struct PlannedEntry {
    index: usize,
    target: SafePath,
    is_directory: bool,
    permissions: Option<u32>,
}

/// Extracts every entry of `source` under `root`.
///
/// # Errors
///
/// See [`unpack_with_mapper`].
///
/// # Examples
///
/// ```no_run
/// use zipwright_core::{UnpackOptions, unpack};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = unpack("bundle.zip", "/tmp/bundle", &UnpackOptions::default())?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn unpack(
    source: impl AsRef<Path>,
    root: impl AsRef<Path>,
    options: &UnpackOptions,
) -> Result<UnpackReport> {
    unpack_with_mapper(source, root, options, |name| Some(name.to_string()))
}

/// Extracts entries under `root`, renaming each through `mapper`.
///
/// `mapper` returns the relative output name for an entry, or `None` to skip
/// it. Every mapped name is validated before anything is written, so a
/// single escaping name aborts the extraction with no files created.
///
/// # Errors
///
/// Returns an error if:
/// - A mapped name escapes `root` ([`ArchiveError::MaliciousEntry`])
/// - An entry is a symbolic link ([`ArchiveError::Unsupported`])
/// - A write lands outside `root` through an existing symbolic link
/// - The archive cannot be read or a file cannot be written
pub fn unpack_with_mapper<F>(
    source: impl AsRef<Path>,
    root: impl AsRef<Path>,
    options: &UnpackOptions,
    mapper: F,
) -> Result<UnpackReport>
where
    F: Fn(&str) -> Option<String>,
{
    let start = Instant::now();
    let root = root.as_ref();
    let mut archive = open_archive(source.as_ref())?;
    let mut report = UnpackReport::new();

    let mut plan = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let metadata = EntryMetadata::read(&mut archive, index, options.name_encoding)?;
        let Some(mapped) = mapper(&metadata.name) else {
            debug!("skipping {}", metadata.name);
            report.entries_skipped += 1;
            continue;
        };

        if metadata.asi().is_some_and(|asi| asi.is_symlink()) {
            return Err(ArchiveError::Unsupported {
                feature: format!("symbolic link entry {}", metadata.name),
            });
        }

        let target = SafePath::resolve(root, &mapped)?;
        if target.relative().is_empty() && !metadata.is_directory {
            return Err(ArchiveError::format(format!(
                "file entry {} resolves to the extraction root",
                metadata.name
            )));
        }

        plan.push(PlannedEntry {
            index,
            target,
            is_directory: metadata.is_directory || mapped.ends_with('/'),
            permissions: metadata.permissions,
        });
    }

    fs::create_dir_all(root)?;
    let canonical_root = fs::canonicalize(root)?;
    let mut buffer = CopyBuffer::new();
    let mut directory_modes = Vec::new();
    let mut permissions_skipped = false;

    for entry in plan {
        let relative = entry.target.relative();
        let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

        if entry.is_directory {
            let path = create_dirs_within(&canonical_root, &segments, relative)?;
            report.directories_created += 1;
            if let Some(mode) = entry.permissions {
                directory_modes.push((path, mode));
            }
            continue;
        }

        let Some(file_name) = segments.pop() else {
            return Err(ArchiveError::format(format!(
                "file entry {relative} has no file name"
            )));
        };
        let path = create_dirs_within(&canonical_root, &segments, relative)?.join(file_name);
        remove_symlink(&path)?;

        let mut file = archive.by_index(entry.index)?;
        let mut output = BufWriter::new(File::create(&path)?);
        report.bytes_written += copy_with_buffer(&mut file, &mut output, &mut buffer)?;
        output.flush()?;
        drop(output);
        report.files_extracted += 1;

        if options.preserve_permissions
            && let Some(mode) = entry.permissions
        {
            permissions_skipped |= !apply_permissions(&path, mode)?;
        }
    }

    // Directories last, so read-only directories do not block their contents
    if options.preserve_permissions {
        for (path, mode) in directory_modes.iter().rev() {
            permissions_skipped |= !apply_permissions(path, *mode)?;
        }
    }

    if permissions_skipped {
        warn!("permissions not applied: unsupported on this platform");
    }

    report.duration = start.elapsed();
    Ok(report)
}

/// Extracts the single entry `name` to `target_file`.
///
/// Returns `false` if the archive has no such entry. A directory entry
/// creates `target_file` as a directory.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or the file cannot be
/// written.
pub fn unpack_entry(
    source: impl AsRef<Path>,
    name: &str,
    target_file: impl AsRef<Path>,
) -> Result<bool> {
    let target_file = target_file.as_ref();
    let mut archive = open_archive(source.as_ref())?;
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if file.is_dir() {
        fs::create_dir_all(target_file)?;
        return Ok(true);
    }

    if let Some(parent) = target_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut output = BufWriter::new(File::create(target_file)?);
    copy_with_buffer(&mut file, &mut output, &mut CopyBuffer::new())?;
    output.flush()?;
    Ok(true)
}

/// Creates the directories `segments` under `canonical_root` one level at a
/// time and returns the last one.
///
/// Each existing level is checked before anything below it is created: a
/// symbolic link must resolve inside the root, so no directory is ever
/// created through a link that points elsewhere.
fn create_dirs_within(canonical_root: &Path, segments: &[&str], name: &str) -> Result<PathBuf> {
    let mut current = canonical_root.to_path_buf();

    for segment in segments {
        current.push(segment);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let resolved = fs::canonicalize(&current)?;
                if !resolved.starts_with(canonical_root) {
                    return Err(ArchiveError::MaliciousEntry {
                        name: name.to_string(),
                        root: canonical_root.to_path_buf(),
                    });
                }
                if !resolved.is_dir() {
                    return Err(not_a_directory(&current));
                }
                current = resolved;
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(not_a_directory(&current)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir(&current) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && current.is_dir() => {}
                Err(e) => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        }
    }

    Ok(current)
}

fn not_a_directory(path: &Path) -> ArchiveError {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} exists and is not a directory", path.display()),
    )
    .into()
}

/// Removes a pre-existing symbolic link at `path` so the write cannot follow
/// it.
fn remove_symlink(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("replacing symbolic link {}", path.display());
            fs::remove_file(path)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Applies permission bits. Returns `false` where the platform has none.
#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u32) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(true)
}

#[cfg(not(unix))]
fn apply_permissions(path: &Path, mode: u32) -> Result<bool> {
    debug!("not applying mode {mode:o} to {}", path.display());
    Ok(false)
}
