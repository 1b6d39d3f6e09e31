//! Validated entry paths.
//!
//! A [`SafePath`] only exists for names that stay inside their root.

pub mod safe_path;

pub use safe_path::SafePath;
