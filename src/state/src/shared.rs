use crate::table::StateTable;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Binds `share_label` strings to tables, so several operator instances
/// that name the same share label operate on one underlying
/// `StateTable`. Grounded on `label::Registry`'s interning pattern,
/// generalized from interning names to interning table handles.
#[derive(Default)]
pub struct SharedTables {
    inner: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl SharedTables {
    pub fn new() -> Self {
        SharedTables::default()
    }

    /// Returns the table already bound to `share_label`, or creates one
    /// with `create` and binds it. The first binder's table (and, if it
    /// used `with_evict`, its eviction callback) wins; later callers
    /// asking for the same label get that same table regardless of what
    /// `create` they pass.
    pub fn get_or_create<K, V>(
        &self,
        share_label: &str,
        create: impl FnOnce() -> StateTable<K, V>,
    ) -> Arc<StateTable<K, V>>
    where
        K: 'static + Eq + Hash + Clone + Send + Sync,
        V: 'static + Default + Send + Sync,
    {
        let mut map = self.inner.lock().unwrap();
        if let Some(existing) = map.get(share_label) {
            if let Ok(table) = Arc::clone(existing).downcast::<StateTable<K, V>>() {
                return table;
            }
        }
        let table: Arc<StateTable<K, V>> = Arc::new(create());
        map.insert(share_label.to_string(), table.clone());
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_returns_same_table() {
        let shared = SharedTables::new();
        let a = shared.get_or_create::<i32, i64>("x", || StateTable::new(10));
        let b = shared.get_or_create::<i32, i64>("x", || StateTable::new(999));
        a.find_attach(1);
        assert!(b.find(&1).is_some());
    }

    #[test]
    fn test_different_labels_are_independent() {
        let shared = SharedTables::new();
        let a = shared.get_or_create::<i32, i64>("x", || StateTable::new(10));
        let b = shared.get_or_create::<i32, i64>("y", || StateTable::new(10));
        a.find_attach(1);
        assert!(b.find(&1).is_none());
    }
}
