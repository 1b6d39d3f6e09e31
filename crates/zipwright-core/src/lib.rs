//! Single-pass ZIP rewriting with zip-slip protection.
//!
//! `zipwright-core` modifies ZIP archives without unpacking them: pending
//! additions, removals, replacements and transformations are collected in an
//! [`OperationSet`] and applied in one streaming pass by [`execute`].
//! Untouched entries are copied with their compressed bytes unchanged, and
//! the output replaces the destination atomically.
//!
//! The crate also carries a codec for the ASi Unix extra field (permission
//! bits, owner, symlink target), read-only inspection helpers, and
//! path-checked extraction that refuses entry names escaping the target
//! directory.
//!
//! # Examples
//!
//! ```no_run
//! use zipwright_core::{EntrySource, OperationSet, RewriteOptions, execute};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let operations = OperationSet::builder()
//!     .remove_prefix("build/cache")
//!     .add(EntrySource::bytes("META-INF/VERSION", b"1.4.2\n".to_vec()))
//!     .options(RewriteOptions::default().with_preserve_timestamps(true))
//!     .build();
//!
//! let report = execute("app.zip", operations)?;
//! println!("{} entries written", report.entries_written());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod copy;
pub mod entry;
pub mod error;
pub mod extra;
pub mod extraction;
pub mod inspection;
pub mod io;
pub mod report;
pub mod rewrite;
pub mod security;
pub mod timestamp;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main API types
pub use config::NameEncoding;
pub use config::RewriteOptions;
pub use config::UnpackOptions;
pub use error::ArchiveError;
pub use error::Result;
pub use report::RewriteReport;
pub use report::UnpackReport;

pub use rewrite::Operation;
pub use rewrite::OperationSet;
pub use rewrite::OperationSetBuilder;
pub use rewrite::execute;
pub use rewrite::pack_entries;

pub use entry::EntryContent;
pub use entry::EntryMetadata;
pub use entry::EntrySource;
pub use entry::EntryTransformer;

pub use extra::AsiExtraField;
pub use extra::ExtraFieldRecord;
pub use extra::ExtraFieldRegistry;

pub use extraction::unpack;
pub use extraction::unpack_entry;
pub use extraction::unpack_with_mapper;

pub use inspection::archive_equals;
pub use inspection::contains_entry;
pub use inspection::entry_equals;
pub use inspection::entry_metadata;
pub use inspection::entry_names;
pub use inspection::iterate;
pub use inspection::iterate_names;
pub use inspection::read_entry;

pub use security::is_contained;
pub use types::SafePath;
