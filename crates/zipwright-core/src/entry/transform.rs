//! Content transformers applied during a rewrite.

use std::io::Read;

use super::EntryMetadata;
use super::EntrySource;
use crate::Result;

/// Produces a replacement for an existing entry from its current content.
///
/// The returned source is written in place of the original. Its name may
/// differ from the original's, which renames the entry. Timestamp and
/// permissions not set on the returned source are inherited from the
/// original entry.
///
/// Closures of the right shape implement this trait:
///
/// ```
/// use std::io::Read;
/// use zipwright_core::{EntryMetadata, EntrySource, EntryTransformer, Result};
///
/// let upper = |meta: &EntryMetadata, input: &mut dyn Read| -> Result<EntrySource> {
///     let mut text = String::new();
///     input.read_to_string(&mut text)?;
///     Ok(EntrySource::bytes(meta.name.clone(), text.to_uppercase()))
/// };
///
/// fn accepts(_: impl EntryTransformer) {}
/// accepts(upper);
/// ```
pub trait EntryTransformer {
    /// Builds the replacement entry.
    ///
    /// # Errors
    ///
    /// Any error aborts the rewrite.
    fn transform(&self, metadata: &EntryMetadata, content: &mut dyn Read) -> Result<EntrySource>;
}

impl<F> EntryTransformer for F
where
    F: Fn(&EntryMetadata, &mut dyn Read) -> Result<EntrySource>,
{
    fn transform(&self, metadata: &EntryMetadata, content: &mut dyn Read) -> Result<EntrySource> {
        self(metadata, content)
    }
}
