//! Operation reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Report of a rewrite pass.
///
/// Every source entry lands in exactly one of the copied, removed, replaced,
/// transformed or skipped counters.
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    /// Archive that was written.
    pub destination: PathBuf,

    /// `true` if the source archive was replaced.
    pub in_place: bool,

    /// Source entries copied unchanged (raw bytes).
    pub entries_copied: usize,

    /// Source entries dropped by exact or prefix removal.
    pub entries_removed: usize,

    /// Source entries replaced in place by a replacement or add.
    pub entries_replaced: usize,

    /// Source entries rewritten by a transformer.
    pub entries_transformed: usize,

    /// New entries appended after the source entries.
    pub entries_added: usize,

    /// Entries not written because their name was already taken.
    pub duplicates_skipped: usize,

    /// Duration of the operation.
    pub duration: Duration,
}

impl RewriteReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the written archive.
    #[must_use]
    pub fn entries_written(&self) -> usize {
        self.entries_copied + self.entries_replaced + self.entries_transformed + self.entries_added
    }

    /// Returns `true` if the written archive differs from a plain copy.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.entries_removed
            + self.entries_replaced
            + self.entries_transformed
            + self.entries_added
            + self.duplicates_skipped
            > 0
    }
}

/// Report of an unpack operation.
#[derive(Debug, Clone, Default)]
pub struct UnpackReport {
    /// Number of files written.
    pub files_extracted: usize,

    /// Number of directories created for directory entries.
    pub directories_created: usize,

    /// Entries the name mapper skipped.
    pub entries_skipped: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the operation.
    pub duration: Duration,
}

impl UnpackReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns total number of entries materialized.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created
    }
}
