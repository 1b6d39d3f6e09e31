//! Archive entries: header metadata, new-content sources and transformers.

pub mod metadata;
pub mod source;
pub mod transform;

pub use metadata::EntryMetadata;
pub use source::EntryContent;
pub use source::EntrySource;
pub use source::OpenedEntry;
pub use transform::EntryTransformer;
