//! Read-only access to archive contents.
//!
//! # Examples
//!
//! ```no_run
//! use zipwright_core::{archive_equals, entry_names};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for name in entry_names("release.zip")? {
//!     println!("{name}");
//! }
//! if archive_equals("release.zip", "release-copy.zip")? {
//!     println!("archives are identical");
//! }
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod iterate;

pub use compare::archive_equals;
pub use compare::entry_equals;
pub use iterate::contains_entry;
pub use iterate::entry_metadata;
pub use iterate::entry_names;
pub use iterate::iterate;
pub use iterate::iterate_names;
pub use iterate::read_entry;
