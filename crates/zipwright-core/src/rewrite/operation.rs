//! Pending modifications of an archive.

use std::fmt;
use std::path::PathBuf;

use crate::RewriteOptions;
use crate::entry::EntrySource;
use crate::entry::EntryTransformer;

/// One pending modification.
pub enum Operation {
    /// Add a new entry. Replaces a same-named source entry in place.
    Add(EntrySource),
    /// Drop the entry with exactly this name.
    Remove(String),
    /// Drop the entry named by this prefix and every entry below it.
    RemovePrefix(String),
    /// Replace the named source entry. No effect if the name is absent.
    Replace(String, EntrySource),
    /// Rewrite the named source entry from its current content.
    Transform(String, Box<dyn EntryTransformer>),
}

impl Operation {
    /// Returns the entry name or prefix this operation targets.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Add(source) => source.name(),
            Self::Remove(name)
            | Self::RemovePrefix(name)
            | Self::Replace(name, _)
            | Self::Transform(name, _) => name,
        }
    }

    /// Returns the operation type as a string.
    #[must_use]
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::RemovePrefix(_) => "remove-prefix",
            Self::Replace(..) => "replace",
            Self::Transform(..) => "transform",
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(source) => f.debug_tuple("Add").field(source).finish(),
            Self::Remove(name) => f.debug_tuple("Remove").field(name).finish(),
            Self::RemovePrefix(prefix) => f.debug_tuple("RemovePrefix").field(prefix).finish(),
            Self::Replace(name, source) => {
                f.debug_tuple("Replace").field(name).field(source).finish()
            }
            Self::Transform(name, _) => f.debug_tuple("Transform").field(name).finish(),
        }
    }
}

/// Immutable set of pending operations plus rewrite options.
///
/// Built with [`OperationSetBuilder`] and consumed by
/// [`execute`](crate::execute).
///
/// # Examples
///
/// ```
/// use zipwright_core::{EntrySource, OperationSet, RewriteOptions};
///
/// let set = OperationSet::builder()
///     .remove("obsolete.txt")
///     .remove_prefix("cache/")
///     .add(EntrySource::bytes("VERSION", b"2.0\n".to_vec()))
///     .options(RewriteOptions::default().with_preserve_timestamps(true))
///     .build();
/// assert_eq!(set.len(), 3);
/// assert!(set.options().preserve_timestamps);
/// ```
#[derive(Debug, Default)]
pub struct OperationSet {
    operations: Vec<Operation>,
    options: RewriteOptions,
}

impl OperationSet {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> OperationSetBuilder {
        OperationSetBuilder::new()
    }

    /// Returns the operations in registration order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the rewrite options.
    #[must_use]
    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if there are no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Operation>, RewriteOptions) {
        (self.operations, self.options)
    }
}

/// Builder for [`OperationSet`].
#[derive(Debug, Default)]
pub struct OperationSetBuilder {
    operations: Vec<Operation>,
    options: RewriteOptions,
}

impl OperationSetBuilder {
    /// Creates a builder with no operations and default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an add.
    #[must_use]
    pub fn add(mut self, source: EntrySource) -> Self {
        self.operations.push(Operation::Add(source));
        self
    }

    /// Queues an add for every source, in iteration order.
    #[must_use]
    pub fn add_all(mut self, sources: impl IntoIterator<Item = EntrySource>) -> Self {
        self.operations
            .extend(sources.into_iter().map(Operation::Add));
        self
    }

    /// Queues an exact-name removal.
    #[must_use]
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.operations.push(Operation::Remove(name.into()));
        self
    }

    /// Queues a prefix removal at path-segment boundaries.
    ///
    /// `"a/b"` removes `"a/b"`, `"a/b/"` and everything under `"a/b/"`, but
    /// not `"a/bb.txt"` or `"a/b.txt"`. A trailing `/` on the prefix is
    /// ignored.
    #[must_use]
    pub fn remove_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.operations.push(Operation::RemovePrefix(prefix.into()));
        self
    }

    /// Queues a replacement of `name`.
    #[must_use]
    pub fn replace(mut self, name: impl Into<String>, source: EntrySource) -> Self {
        self.operations.push(Operation::Replace(name.into(), source));
        self
    }

    /// Queues a transformation of `name`.
    #[must_use]
    pub fn transform(
        mut self,
        name: impl Into<String>,
        transformer: impl EntryTransformer + 'static,
    ) -> Self {
        self.operations
            .push(Operation::Transform(name.into(), Box::new(transformer)));
        self
    }

    /// Sets the rewrite options.
    #[must_use]
    pub fn options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the destination archive.
    #[must_use]
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.options.destination = Some(destination.into());
        self
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> OperationSet {
        OperationSet {
            operations: self.operations,
            options: self.options,
        }
    }
}
