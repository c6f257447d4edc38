use crate::table::{SlotGuard, StateTable};
use std::hash::Hash;
use std::marker::PhantomData;

/// A round-robin cursor over a table's slots, used for gradual
/// (non-blocking) expiration - one `next()` call visits exactly one
/// slot, and wrapping back to the start bumps `loop_count`.
pub struct Walker<K> {
    position: usize,
    loop_count: u64,
    _marker: PhantomData<K>,
}

impl<K> Default for Walker<K> {
    fn default() -> Self {
        Walker {
            position: 0,
            loop_count: 0,
            _marker: PhantomData,
        }
    }
}

impl<K> Walker<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Walker::default()
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    pub fn next<V>(&mut self, table: &StateTable<K, V>) -> Option<(K, SlotGuard<V>)>
    where
        V: Default,
    {
        if table.is_empty() {
            return None;
        }
        if self.position >= table.len() {
            self.position = 0;
            self.loop_count += 1;
        }
        let result = table.get_index_for_walker(self.position);
        self.position += 1;
        result
    }
}
