//! Single-pass archive rewriting.
//!
//! A rewrite walks the source archive once. Each entry is removed,
//! transformed, replaced or copied as raw compressed bytes according to the
//! pending [`OperationSet`], and adds that did not replace an existing entry
//! are appended at the end. Output names are unique and checked against
//! zip-slip before anything is written.

mod central;
mod disposition;
pub mod engine;
pub mod operation;

pub use engine::execute;
pub use engine::pack_entries;
pub use operation::Operation;
pub use operation::OperationSet;
pub use operation::OperationSetBuilder;
