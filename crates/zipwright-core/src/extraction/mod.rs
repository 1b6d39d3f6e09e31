//! Extraction of archive entries to the filesystem.
//!
//! Every entry name is resolved against the extraction root before any
//! file is written. Names that would escape the root abort the whole
//! extraction.

pub mod unpack;

pub use unpack::unpack;
pub use unpack::unpack_entry;
pub use unpack::unpack_with_mapper;
