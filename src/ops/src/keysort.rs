use label::Label;
use state::StateTable;
use std::collections::VecDeque;
use std::sync::Arc;
use tuple::Tuple;

#[derive(Default)]
pub struct KeysortSlot {
    buffer: VecDeque<(f64, Tuple)>,
}

/// Per-key streaming window sort over a fixed circular buffer of size
/// `capacity`, grounded on `original_source/src/procs/proc_keysort.c`.
///
/// Built directly against `state::StateTable` rather than through
/// `harness::OperatorDescriptor`: a displaced or stale insertion must
/// emit a *different* tuple than the one just processed (the evicted
/// oldest, or the incoming tuple itself left unsorted), which
/// `OperatorDescriptor::update_value`'s single forward-the-input-tuple
/// contract can't express - recorded as a deviation in `DESIGN.md`.
pub struct Keysort {
    key_label: Label,
    value_label: Label,
    capacity: usize,
    table: Arc<StateTable<u64, KeysortSlot>>,
    seed: u64,
}

impl Keysort {
    pub fn new(key_label: Label, value_label: Label, capacity: usize, table_size: usize, seed: u64) -> Self {
        Keysort {
            key_label,
            value_label,
            capacity: capacity.max(1),
            table: Arc::new(StateTable::new(table_size)),
            seed,
        }
    }

    fn key_hash(&self, tuple: &Tuple) -> Option<u64> {
        let key_member = tuple.find(&self.key_label).into_iter().next()?;
        let mut acc = self.seed;
        key_member.mix_hash(self.seed, &mut acc);
        Some(acc)
    }

    /// Processes one input tuple, returning any tuple that should be
    /// forwarded immediately (a displaced oldest entry, or the incoming
    /// tuple itself if it arrived stale/out-of-window).
    pub fn process(&self, tuple: &Tuple) -> Option<Tuple> {
        let key_hash = self.key_hash(tuple)?;
        let value = tuple.find(&self.value_label).into_iter().next()?;
        let v = value.as_value()?.as_double()?;

        let slot_guard = self.table.find_attach(key_hash);
        let mut slot = slot_guard.lock();
        insert(&mut slot.buffer, self.capacity, v, tuple.clone())
    }

    /// Drains every key's buffer in sorted order - the `EXPIRE`/`FLUSH`
    /// equivalent for this bespoke table.
    pub fn drain_all(&self) -> Vec<Tuple> {
        let mut out = Vec::new();
        self.table.scour_and_flush(|_key, slot| {
            for (_, tup) in slot.buffer {
                out.push(tup);
            }
        });
        out
    }
}

fn insert(buffer: &mut VecDeque<(f64, Tuple)>, capacity: usize, value: f64, tuple: Tuple) -> Option<Tuple> {
    if buffer.is_empty() {
        buffer.push_back((value, tuple));
        return None;
    }
    let newest = buffer.back().unwrap().0;
    let oldest = buffer.front().unwrap().0;

    if value >= newest {
        buffer.push_back((value, tuple));
    } else if value < oldest {
        return Some(tuple);
    } else {
        let pos = buffer.iter().position(|(v, _)| value < *v).unwrap_or(buffer.len());
        buffer.insert(pos, (value, tuple));
    }

    if buffer.len() > capacity {
        buffer.pop_front().map(|(_, tup)| tup)
    } else {
        None
    }
}
