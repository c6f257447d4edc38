use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// A slot behind the table, returned to callers who then lock it
/// directly - the table's own `RwLock` is released as soon as the slot
/// is located, matching `storage::Table`'s `Arc<DB>` handle plus
/// per-call locking split of "coarse structural lock, fine content
/// lock".
pub struct SlotGuard<V> {
    slot: Arc<Mutex<V>>,
}

impl<V> SlotGuard<V> {
    pub fn lock(&self) -> MutexGuard<'_, V> {
        self.slot.lock().unwrap()
    }
}

type OnEvict<K, V> = Mutex<Box<dyn FnMut(K, V) + Send>>;

/// A bounded, LRU-evicting associative store shared by the keyed-
/// operator harness and by operators that keep their own keyed state
/// directly (`ops::countfilter`, `ops::keysort`, ...).
///
/// Grounded on `HashGroupExecutor`'s hashmap-keyed per-key state,
/// generalized from a one-shot aggregation pass to a long-lived,
/// bounded, evictable table by swapping the backing `HashMap` for an
/// `indexmap::IndexMap` - the teacher has no ordered/evictable map of
/// its own, `indexmap` is a fresh addition (see `DESIGN.md`).
pub struct StateTable<K, V> {
    inner: RwLock<IndexMap<K, Arc<Mutex<V>>>>,
    capacity: usize,
    on_evict: Option<OnEvict<K, V>>,
}

impl<K, V> StateTable<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    pub fn new(capacity: usize) -> Self {
        StateTable {
            inner: RwLock::new(IndexMap::new()),
            capacity: capacity.max(1),
            on_evict: None,
        }
    }

    pub fn with_evict(capacity: usize, on_evict: Box<dyn FnMut(K, V) + Send>) -> Self {
        StateTable {
            inner: RwLock::new(IndexMap::new()),
            capacity: capacity.max(1),
            on_evict: Some(Mutex::new(on_evict)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// Locates `key`'s slot, creating it (zeroed via `V::default()`) if
    /// absent. Inserting past `capacity` evicts the least-recently-
    /// activated entry - the front of the index map's activation order -
    /// invoking `on_evict` first. A touch here always moves `key` to the
    /// back of that order.
    pub fn find_attach(&self, key: K) -> SlotGuard<V> {
        let mut map = self.inner.write().unwrap();
        if let Some((idx, _, slot)) = map.get_full(&key) {
            let slot = Arc::clone(slot);
            let last = map.len() - 1;
            map.move_index(idx, last);
            return SlotGuard { slot };
        }
        if map.len() >= self.capacity {
            if let Some((ev_key, ev_slot)) = map.shift_remove_index(0) {
                if let Ok(mutex) = Arc::try_unwrap(ev_slot) {
                    let value = mutex.into_inner().unwrap();
                    if let Some(cb) = &self.on_evict {
                        (cb.lock().unwrap())(ev_key, value);
                    }
                }
            }
        }
        let slot = Arc::new(Mutex::new(V::default()));
        map.insert(key, Arc::clone(&slot));
        SlotGuard { slot }
    }

    /// Looks up `key` without creating or touching activation order.
    pub fn find(&self, key: &K) -> Option<SlotGuard<V>> {
        let map = self.inner.read().unwrap();
        map.get(key).map(|slot| SlotGuard {
            slot: Arc::clone(slot),
        })
    }

    /// Removes `key`'s entry and returns its value, if present. Does
    /// not invoke `on_evict` - that callback fires only on capacity-
    /// driven overwrite; callers that need terminal-state emission on
    /// an explicit delete do so themselves (see `harness::Harness`'s
    /// `Port::Delete` handling).
    pub fn delete(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write().unwrap();
        let slot = map.shift_remove(key)?;
        Arc::try_unwrap(slot).ok().map(|m| m.into_inner().unwrap())
    }

    /// Non-destructive walk of every occupied slot.
    pub fn scour(&self, mut cb: impl FnMut(&K, &V)) {
        let map = self.inner.read().unwrap();
        for (key, slot) in map.iter() {
            let guard = slot.lock().unwrap();
            cb(key, &guard);
        }
    }

    /// Walks every slot, then empties the table.
    pub fn scour_and_flush(&self, mut cb: impl FnMut(K, V)) {
        let mut map = self.inner.write().unwrap();
        for (key, slot) in map.drain(..) {
            if let Ok(mutex) = Arc::try_unwrap(slot) {
                cb(key, mutex.into_inner().unwrap());
            }
        }
    }

    pub(crate) fn get_index_for_walker(&self, position: usize) -> Option<(K, SlotGuard<V>)> {
        let map = self.inner.read().unwrap();
        map.get_index(position).map(|(k, slot)| {
            (
                k.clone(),
                SlotGuard {
                    slot: Arc::clone(slot),
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_attach_creates_default() {
        let table: StateTable<String, i64> = StateTable::new(10);
        let slot = table.find_attach("a".to_string());
        assert_eq!(*slot.lock(), 0);
        *slot.lock() = 5;
        let slot2 = table.find_attach("a".to_string());
        assert_eq!(*slot2.lock(), 5);
    }

    #[test]
    fn test_find_missing_returns_none() {
        let table: StateTable<String, i64> = StateTable::new(10);
        assert!(table.find(&"missing".to_string()).is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recently_activated() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let evicted_clone = Arc::clone(&evicted);
        let table: StateTable<i32, i32> = StateTable::with_evict(
            2,
            Box::new(move |k, v| evicted_clone.lock().unwrap().push((k, v))),
        );
        table.find_attach(1);
        table.find_attach(2);
        // Touch 1 again so 2 becomes the least-recently-activated.
        table.find_attach(1);
        table.find_attach(3);
        assert_eq!(*evicted.lock().unwrap(), vec![(2, 0)]);
        assert!(table.find(&1).is_some());
        assert!(table.find(&3).is_some());
    }

    #[test]
    fn test_delete_removes_entry() {
        let table: StateTable<String, i64> = StateTable::new(10);
        table.find_attach("a".to_string());
        assert_eq!(table.delete(&"a".to_string()), Some(0));
        assert!(table.find(&"a".to_string()).is_none());
    }

    #[test]
    fn test_scour_and_flush_empties_table() {
        let table: StateTable<i32, i32> = StateTable::new(10);
        table.find_attach(1);
        table.find_attach(2);
        let mut seen = Vec::new();
        table.scour_and_flush(|k, v| seen.push((k, v)));
        seen.sort();
        assert_eq!(seen, vec![(1, 0), (2, 0)]);
        assert!(table.is_empty());
    }
}
