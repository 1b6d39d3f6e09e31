//! Opening source archives.

use std::fs::File;
use std::io::BufReader;
use std::io::ErrorKind;
use std::path::Path;

use zip::ZipArchive;

use crate::ArchiveError;
use crate::Result;

/// ZIP archive backed by a buffered file.
pub type FileArchive = ZipArchive<BufReader<File>>;

/// Opens `path` as a ZIP archive.
///
/// # Errors
///
/// Returns [`ArchiveError::SourceNotFound`] if the file does not exist and
/// [`ArchiveError::Format`] if it is not a readable ZIP archive.
pub fn open_archive(path: &Path) -> Result<FileArchive> {
    let file = open_source(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Opens an input file, mapping a missing file to
/// [`ArchiveError::SourceNotFound`].
pub(crate) fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ArchiveError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ArchiveError::Io(e)
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_zip;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = open_archive(&temp.path().join("missing.zip")).unwrap_err();
        assert!(matches!(err, ArchiveError::SourceNotFound { .. }));
    }

    #[test]
    fn test_open_not_a_zip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.txt");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        let err = open_archive(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Format(_)));
    }

    #[test]
    fn test_open_valid_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ok.zip");
        std::fs::write(&path, create_test_zip(vec![("a.txt", b"a")])).unwrap();
        assert_eq!(open_archive(&path).unwrap().len(), 1);
    }
}
