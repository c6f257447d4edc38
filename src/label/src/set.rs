use crate::Label;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NESTING_ID: AtomicU32 = AtomicU32::new(1);

fn next_nesting_id() -> u32 {
    NEXT_NESTING_ID.fetch_add(1, Ordering::Relaxed)
}

/// One label in a set, annotated with the nesting id a member must carry
/// (via `tuple::Member::nested`) for a dotted path to recurse into it.
/// `nesting_id == 0` means this entry is a leaf - matches are taken from
/// the member directly, nothing to recurse into.
#[derive(Clone, Debug)]
pub struct LabelSetEntry {
    pub label: Label,
    pub nesting_id: u32,
}

/// A tree of label sets built by [`crate::Registry::parse_path`]. Each
/// level of a dotted path becomes one set of entries; entries with a
/// non-zero `nesting_id` have a corresponding child set reachable through
/// `children`.
#[derive(Clone, Debug, Default)]
pub struct NestedLabelSet {
    pub entries: Vec<LabelSetEntry>,
    pub children: HashMap<u32, NestedLabelSet>,
}

impl NestedLabelSet {
    pub fn leaf(label: Label) -> Self {
        NestedLabelSet {
            entries: vec![LabelSetEntry {
                label,
                nesting_id: 0,
            }],
            children: HashMap::new(),
        }
    }

    pub fn nested(label: Label, child: NestedLabelSet) -> Self {
        let nesting_id = next_nesting_id();
        let mut children = HashMap::with_capacity(1);
        children.insert(nesting_id, child);
        NestedLabelSet {
            entries: vec![LabelSetEntry { label, nesting_id }],
            children,
        }
    }

    /// Returns the child set a matching member at `nesting_id` should be
    /// searched with next, or `None` if this is a leaf match.
    pub fn child(&self, nesting_id: u32) -> Option<&NestedLabelSet> {
        if nesting_id == 0 {
            None
        } else {
            self.children.get(&nesting_id)
        }
    }
}
