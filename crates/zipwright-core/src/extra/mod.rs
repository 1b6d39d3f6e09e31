//! ZIP extra-field codec.
//!
//! Extra fields carry per-entry metadata the central directory has no slot
//! for. This crate decodes the Info-ZIP Unix record to keep POSIX permission
//! bits across rewrites, and passes every other block through untouched.

pub mod asi;
pub mod field;

pub use asi::ASI_HEADER_ID;
pub use asi::AsiExtraField;
pub use asi::PERMISSION_MASK;
pub use asi::S_IFDIR;
pub use asi::S_IFLNK;
pub use asi::S_IFMT;
pub use asi::S_IFREG;
pub use field::DecodeFn;
pub use field::ExtraFieldRecord;
pub use field::ExtraFieldRegistry;
pub use field::ExtraFieldRegistryBuilder;
pub use field::find_permission;
pub use field::parse;
pub use field::parse_with;
pub use field::serialize;
