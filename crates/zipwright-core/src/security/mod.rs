//! Security validation.

pub mod path;

pub use path::is_contained;
pub use path::validate_entry_name;
