//! Label interning and registration.
//!
//! A `Label` is a small, cheaply-cloned handle onto an interned name. Labels
//! that are registered via [`Registry::register_indexed`] get a dense,
//! positive `index_id` that tuples use to build an O(1) inverted index
//! (see the `tuple` crate). Labels registered via [`Registry::register`]
//! stay unindexed (`index_id == 0`) - they can still be attached to
//! records, they just don't participate in lookup-by-label.

mod error;
mod set;

pub use error::LabelError;
pub use set::{LabelSetEntry, NestedLabelSet};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// An interned label. Two labels compare equal iff they share the same
/// name - `index_id` is assigned once at registration time and never
/// changes afterwards.
#[derive(Clone)]
pub struct Label {
    name: Arc<str>,
    index_id: u32,
}

impl Label {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0 means this label is not indexed and will never appear in a
    /// tuple's inverted index.
    pub fn index_id(&self) -> u32 {
        self.index_id
    }

    pub fn is_indexed(&self) -> bool {
        self.index_id != 0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("name", &self.name)
            .field("index_id", &self.index_id)
            .finish()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name) || self.name == other.name
    }
}

impl Eq for Label {}

impl std::hash::Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

struct RegistryInner {
    by_name: BTreeMap<Arc<str>, Label>,
    next_index_id: u32,
}

/// Process-wide (or test-scoped) interning table for labels.
///
/// Grounded on `functions::registry::Registry`'s `BTreeMap`-backed
/// interning table, generalized from function signatures to label names.
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: RwLock::new(RegistryInner {
                by_name: BTreeMap::new(),
                next_index_id: 1,
            }),
        }
    }

    /// Idempotent interning of an unindexed label. If the name was already
    /// registered (indexed or not) the existing label is returned unchanged.
    pub fn register(&self, name: &str) -> Label {
        if let Some(label) = self.search(name) {
            return label;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(label) = inner.by_name.get(name) {
            return label.clone();
        }
        let name: Arc<str> = Arc::from(name);
        let label = Label {
            name: Arc::clone(&name),
            index_id: 0,
        };
        inner.by_name.insert(name, label.clone());
        label
    }

    /// Assigns the next dense `index_id` to `name` if it doesn't already
    /// have one. Calling this repeatedly for the same name always returns
    /// the same `Label` (same index_id) - assignment is monotonic and
    /// never reused, per the invariant that cached tuple bodies must be
    /// able to detect a registry grown since they were allocated.
    pub fn register_indexed(&self, name: &str) -> Label {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.by_name.get(name) {
            if existing.is_indexed() {
                return existing.clone();
            }
        }
        let index_id = inner.next_index_id;
        inner.next_index_id += 1;
        let name: Arc<str> = match inner.by_name.keys().find(|k| k.as_ref() == name) {
            Some(k) => Arc::clone(k),
            None => Arc::from(name),
        };
        let label = Label {
            name: Arc::clone(&name),
            index_id,
        };
        inner.by_name.insert(name, label.clone());
        label
    }

    pub fn search(&self, name: &str) -> Option<Label> {
        self.inner.read().unwrap().by_name.get(name).cloned()
    }

    /// Current count of assigned index ids. Tuple bodies compare this
    /// against the `index_len` they were allocated with and discard
    /// themselves from the free list if the registry has grown since.
    pub fn index_len(&self) -> u32 {
        self.inner.read().unwrap().next_index_id - 1
    }

    /// Parses a dotted path (`A.B.C`) into a tree of label sets, interning
    /// every segment as an indexed label along the way and assigning each
    /// level a distinct nesting id so `tuple::Tuple::nested_search` can
    /// recurse through it.
    pub fn parse_path(&self, path: &str) -> Result<NestedLabelSet, LabelError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(LabelError::InvalidPath(path.to_string()));
        }
        Ok(self.build_nested(&segments))
    }

    fn build_nested(&self, segments: &[&str]) -> NestedLabelSet {
        let label = self.register_indexed(segments[0]);
        if segments.len() == 1 {
            NestedLabelSet::leaf(label)
        } else {
            let child = self.build_nested(&segments[1..]);
            NestedLabelSet::nested(label, child)
        }
    }
}
