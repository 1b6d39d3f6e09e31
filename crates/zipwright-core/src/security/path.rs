//! Zip-slip containment checks.

use std::path::Path;

use crate::Result;
use crate::types::SafePath;

/// Returns `true` if `entry_name` stays within `root` after lexical
/// resolution.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipwright_core::is_contained;
///
/// let root = Path::new("/tmp/out");
/// assert!(is_contained(root, "a/b/../c"));
/// assert!(!is_contained(root, "../x"));
/// assert!(!is_contained(root, "a\\..\\..\\x"));
/// ```
#[must_use]
pub fn is_contained(root: &Path, entry_name: &str) -> bool {
    SafePath::resolve(root, entry_name).is_ok()
}

/// Validates `entry_name` against `root`, returning its resolved path.
///
/// This delegates to [`SafePath::resolve`].
///
/// # Errors
///
/// Returns [`crate::ArchiveError::MaliciousEntry`] if the name escapes the
/// root.
pub fn validate_entry_name(root: &Path, entry_name: &str) -> Result<SafePath> {
    SafePath::resolve(root, entry_name)
}
