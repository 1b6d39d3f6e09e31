//! Per-name resolution of pending operations.

use std::collections::HashMap;
use std::collections::HashSet;

use log::debug;

use super::operation::Operation;
use crate::entry::EntrySource;
use crate::entry::EntryTransformer;

/// What the engine should do with one source entry.
pub(crate) enum Action<'a> {
    /// Emit nothing.
    Remove,
    /// Invoke the transformer and emit its result.
    Transform(&'a dyn EntryTransformer),
    /// Emit this source in place of the entry.
    Replace(EntrySource),
    /// Copy the entry unchanged.
    Copy,
}

/// Operations indexed by entry name.
///
/// Precedence per source entry: removal, then transform, then replace, then
/// add. Whatever wins for a name consumes the replacement and add queued for
/// it, so neither is emitted again later.
#[derive(Default)]
pub(crate) struct Disposition {
    removed: HashSet<String>,
    prefixes: Vec<String>,
    transforms: HashMap<String, Box<dyn EntryTransformer>>,
    replacements: HashMap<String, EntrySource>,
    /// Adds in registration order; superseded or consumed slots are `None`.
    adds: Vec<Option<EntrySource>>,
    add_slots: HashMap<String, usize>,
}

impl Disposition {
    pub(crate) fn new(operations: Vec<Operation>) -> Self {
        let mut disposition = Self::default();

        for operation in operations {
            match operation {
                Operation::Add(source) => {
                    let slot = disposition.adds.len();
                    let name = source.name().to_string();
                    if let Some(previous) = disposition.add_slots.insert(name, slot) {
                        debug!("add of {} supersedes an earlier add", source.name());
                        disposition.adds[previous] = None;
                    }
                    disposition.adds.push(Some(source));
                }
                Operation::Remove(name) => {
                    disposition.removed.insert(name);
                }
                Operation::RemovePrefix(prefix) => {
                    let prefix = prefix.trim_end_matches('/').to_string();
                    disposition.prefixes.push(prefix);
                }
                Operation::Replace(name, source) => {
                    if disposition.replacements.contains_key(&name) {
                        debug!("replacement of {name} supersedes an earlier one");
                    }
                    disposition.replacements.insert(name, source);
                }
                Operation::Transform(name, transformer) => {
                    disposition.transforms.insert(name, transformer);
                }
            }
        }

        disposition
    }

    /// Decides the fate of the source entry `name`.
    pub(crate) fn action(&mut self, name: &str) -> Action<'_> {
        if self.is_removed(name) {
            if self.replacements.remove(name).is_some() {
                debug!("replacement of removed entry {name} ignored");
            }
            return Action::Remove;
        }

        if self.transforms.contains_key(name) {
            self.replacements.remove(name);
            self.take_add(name);
            return match self.transforms.get(name) {
                Some(transformer) => Action::Transform(&**transformer),
                None => Action::Copy,
            };
        }

        if let Some(replacement) = self.replacements.remove(name) {
            self.take_add(name);
            return Action::Replace(replacement);
        }

        match self.take_add(name) {
            Some(add) => Action::Replace(add),
            None => Action::Copy,
        }
    }

    /// Returns `true` if `name` is removed exactly or by prefix.
    pub(crate) fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
            || self
                .prefixes
                .iter()
                .any(|prefix| matches_prefix(name, prefix))
    }

    fn take_add(&mut self, name: &str) -> Option<EntrySource> {
        let slot = self.add_slots.remove(name)?;
        self.adds[slot].take()
    }

    /// Returns the adds not consumed in place, in registration order, and
    /// logs replacements whose target never appeared.
    pub(crate) fn into_remaining_adds(self) -> impl Iterator<Item = EntrySource> {
        for name in self.replacements.keys() {
            debug!("replacement target {name} not found in source archive");
        }
        self.adds.into_iter().flatten()
    }
}

/// Path-segment prefix match. `prefix` carries no trailing `/`.
fn matches_prefix(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
