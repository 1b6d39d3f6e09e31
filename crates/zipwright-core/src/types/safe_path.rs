//! Lexically validated entry paths.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ArchiveError;
use crate::Result;

/// An entry name resolved under a containment root.
///
/// `SafePath` represents an entry name that has been validated to not
/// contain:
/// - A leading `/` or `\`
/// - A drive prefix such as `C:`
/// - NUL bytes
/// - `..` segments that climb above the root
///
/// Both `/` and `\` separate segments. Resolution is purely lexical and
/// never touches the filesystem.
///
/// # Security Properties
///
/// - Can ONLY be constructed through [`SafePath::resolve`]
/// - NO `From<PathBuf>` implementation
/// - The full path always starts with the normalized root
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipwright_core::types::SafePath;
///
/// let safe = SafePath::resolve(Path::new("/srv/out"), "a/b/../c")?;
/// assert_eq!(safe.as_path(), Path::new("/srv/out/a/c"));
/// assert_eq!(safe.relative(), "a/c");
///
/// assert!(SafePath::resolve(Path::new("/srv/out"), "../etc/passwd").is_err());
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath {
    full: PathBuf,
    relative: String,
}

impl SafePath {
    /// Resolves `entry_name` under `root`.
    ///
    /// `.` and empty segments are dropped, `..` removes the previous segment.
    /// A name that resolves to the root itself is contained.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MaliciousEntry`] if the name is absolute,
    /// carries a drive prefix or NUL byte, or climbs above the root.
    pub fn resolve(root: &Path, entry_name: &str) -> Result<Self> {
        let malicious = || ArchiveError::MaliciousEntry {
            name: entry_name.to_string(),
            root: root.to_path_buf(),
        };

        if entry_name.contains('\0') || is_rooted(entry_name) {
            return Err(malicious());
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in entry_name.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(malicious());
                    }
                }
                other => segments.push(other),
            }
        }

        let mut full = normalize_root(root);
        for segment in &segments {
            full.push(segment);
        }

        Ok(Self {
            full,
            relative: segments.join("/"),
        })
    }

    /// Returns the resolved path under the root.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.full
    }

    /// Returns the normalized name relative to the root, `/`-separated.
    #[inline]
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Converts into the resolved `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.full
    }
}

/// Leading separator or `X:` drive prefix.
fn is_rooted(name: &str) -> bool {
    let bytes = name.as_bytes();
    matches!(bytes.first(), Some(b'/' | b'\\'))
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Drops `.` components and folds `..` without touching the filesystem.
fn normalize_root(root: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in root.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/extract")
    }

    #[test]
    fn test_resolve_plain_name() {
        let safe = SafePath::resolve(&root(), "dir/file.txt").unwrap();
        assert_eq!(safe.as_path(), Path::new("/srv/extract/dir/file.txt"));
        assert_eq!(safe.relative(), "dir/file.txt");
    }

    #[test]
    fn test_resolve_folds_parent_segments() {
        let safe = SafePath::resolve(&root(), "a/b/../c").unwrap();
        assert_eq!(safe.into_path_buf(), root().join("a").join("c"));
    }

    #[test]
    fn test_resolve_backslash_separator() {
        let safe = SafePath::resolve(&root(), "a\\b\\file.txt").unwrap();
        assert_eq!(safe.relative(), "a/b/file.txt");
    }

    #[test]
    fn test_resolve_directory_entry() {
        let safe = SafePath::resolve(&root(), "dir/./sub/").unwrap();
        assert_eq!(safe.relative(), "dir/sub");
    }

    #[test]
    fn test_resolve_to_root_is_contained() {
        let safe = SafePath::resolve(&root(), "a/..").unwrap();
        assert_eq!(safe.as_path(), root().as_path());
        assert_eq!(safe.relative(), "");
    }

    #[test]
    fn test_reject_traversal() {
        for name in [
            "../x",
            "a/../../x",
            "a\\..\\..\\x",
            "..",
            "./../x",
            "a/b/../../../x",
        ] {
            let err = SafePath::resolve(&root(), name).unwrap_err();
            assert!(err.is_security_violation(), "should reject {name}");
        }
    }

    #[test]
    fn test_reject_absolute() {
        for name in ["/etc/passwd", "\\windows\\system32", "C:evil", "c:\\evil"] {
            assert!(SafePath::resolve(&root(), name).is_err(), "{name}");
        }
    }

    #[test]
    fn test_reject_nul() {
        assert!(SafePath::resolve(&root(), "a\0b").is_err());
    }

    #[test]
    fn test_error_carries_name_and_root() {
        match SafePath::resolve(&root(), "../../evil.txt").unwrap_err() {
            ArchiveError::MaliciousEntry { name, root: r } => {
                assert_eq!(name, "../../evil.txt");
                assert_eq!(r, root());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_root_is_normalized() {
        let safe = SafePath::resolve(Path::new("/srv/./x/../extract"), "f").unwrap();
        assert_eq!(safe.as_path(), Path::new("/srv/extract/f"));
    }

    #[test]
    fn test_dots_inside_names_are_ordinary() {
        let safe = SafePath::resolve(&root(), "..hidden/a..b").unwrap();
        assert_eq!(safe.relative(), "..hidden/a..b");
    }
}
