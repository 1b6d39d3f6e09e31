//! Two-phase commit of an output file.
//!
//! Output is written to a temporary file in the destination's directory and
//! renamed over the destination only on [`AtomicFile::commit`]. Dropping an
//! uncommitted `AtomicFile` deletes the temporary file and leaves the
//! destination untouched.

use std::fs;
use std::io;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use tempfile::NamedTempFile;

use crate::Result;

/// Permission bits of a newly created output file on Unix.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Output file that replaces its destination atomically.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use zipwright_core::io::AtomicFile;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let dest = dir.path().join("out.bin");
///
/// let mut file = AtomicFile::create(&dest)?;
/// file.write_all(b"payload")?;
/// assert!(!dest.exists());
///
/// file.commit()?;
/// assert_eq!(std::fs::read(&dest)?, b"payload");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AtomicFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl AtomicFile {
    /// Creates a temporary file next to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn create(destination: &Path) -> Result<Self> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = tempfile::Builder::new()
            .prefix(".zipwright-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
        })
    }

    /// Returns the destination path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Returns the temporary file path.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Flushes the temporary file to disk and renames it over the
    /// destination.
    ///
    /// An existing destination keeps its permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if syncing or renaming fails. The temporary file is
    /// removed in that case.
    pub fn commit(mut self) -> Result<()> {
        self.temp.flush()?;
        self.temp.as_file().sync_all()?;

        match fs::metadata(&self.destination) {
            Ok(existing) => self.temp.as_file().set_permissions(existing.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => set_new_file_permissions(&self.temp)?,
            Err(e) => return Err(e.into()),
        }

        debug!(
            "committing {} to {}",
            self.temp.path().display(),
            self.destination.display()
        );
        self.temp
            .persist(&self.destination)
            .map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_new_file_permissions(temp: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_permissions(_temp: &NamedTempFile) -> io::Result<()> {
    Ok(())
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

impl Seek for AtomicFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.temp.seek(pos)
    }
}
