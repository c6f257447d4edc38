use label::Label;
use state::{StateTable, Walker};
use std::collections::VecDeque;
use std::sync::Arc;
use tuple::Tuple;

/// Ports specific to `groupevents` - distinct from `harness::Port`
/// since this operator's external drain signals (`END`, `ENDSTATE`,
/// `ENDSINGLE`) have no equivalent in the generic keyed-operator
/// vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupPort {
    Data,
    /// One cooperative step of the gradual walker.
    Expire,
    /// Drain and remove a specific key's ring entirely.
    End,
    /// Drain a key's ring but keep its singleton values.
    EndState,
    /// Drain only the ring, leaving state/session-hash tracking intact.
    EndSingle,
}

pub struct GroupeventsSlot {
    ring: VecDeque<Tuple>,
    last_common_hash: Option<u64>,
    generation: u32,
}

impl Default for GroupeventsSlot {
    fn default() -> Self {
        GroupeventsSlot {
            ring: VecDeque::new(),
            last_common_hash: None,
            generation: 0,
        }
    }
}

/// Per-key bounded ring of event references, accumulating until either
/// a common-hash change or the ring fills, with external-port draining
/// and walker-driven gradual expiration by generation number.
///
/// Grounded on `original_source/src/procs/proc_groupevents.c`. Built
/// directly against `state::StateTable`/`state::Walker` rather than
/// through `harness::OperatorDescriptor`: the ring needs to be flushed
/// by an out-of-band signal carrying its own semantics (`END` vs.
/// `ENDSTATE` vs `ENDSINGLE`) that the harness's fixed `Port` set
/// doesn't distinguish.
pub struct Groupevents {
    key_label: Label,
    common_labels: Vec<Label>,
    max_values: usize,
    table: Arc<StateTable<u64, GroupeventsSlot>>,
    walker: Walker<u64>,
    seed: u64,
    current_generation: u32,
}

impl Groupevents {
    pub fn new(
        key_label: Label,
        common_labels: Vec<Label>,
        max_values: usize,
        table_size: usize,
        seed: u64,
    ) -> Self {
        Groupevents {
            key_label,
            common_labels,
            max_values: max_values.max(1),
            table: Arc::new(StateTable::new(table_size)),
            walker: Walker::new(),
            seed,
            current_generation: 0,
        }
    }

    fn key_hash(&self, tuple: &Tuple) -> Option<u64> {
        let key_member = tuple.find(&self.key_label).into_iter().next()?;
        let mut acc = self.seed;
        key_member.mix_hash(self.seed, &mut acc);
        Some(acc)
    }

    fn common_hash(&self, tuple: &Tuple) -> Option<u64> {
        if self.common_labels.is_empty() {
            return None;
        }
        let mut acc = self.seed;
        for label in &self.common_labels {
            for member in tuple.find(label) {
                member.mix_hash(self.seed, &mut acc);
            }
        }
        Some(acc)
    }

    /// Accumulates one event into its key's ring. Returns a drained
    /// batch when the common-hash changes or the ring fills.
    pub fn process(&self, tuple: &Tuple) -> Vec<Tuple> {
        let key_hash = match self.key_hash(tuple) {
            Some(h) => h,
            None => return Vec::new(),
        };
        let common = self.common_hash(tuple);

        let slot_guard = self.table.find_attach(key_hash);
        let mut slot = slot_guard.lock();
        slot.generation = self.current_generation;

        let mut drained = Vec::new();
        if let (Some(common), Some(last)) = (common, slot.last_common_hash) {
            if common != last {
                drained.extend(slot.ring.drain(..));
            }
        }
        slot.last_common_hash = common.or(slot.last_common_hash);

        slot.ring.push_back(tuple.clone());
        if slot.ring.len() >= self.max_values {
            // Reaching capacity closes the group out entirely, the same
            // full-drain treatment as a common-hash change - matching
            // `nest_add_value`'s `emit_state_preserve_keys` call, not a
            // one-at-a-time FIFO pop.
            drained.extend(slot.ring.drain(..));
        }
        drained
    }

    /// Handles an external `END`/`ENDSTATE`/`ENDSINGLE` signal for the
    /// key `tuple` carries, returning whatever was ringed for it.
    pub fn signal(&self, port: GroupPort, tuple: &Tuple) -> Vec<Tuple> {
        let key_hash = match self.key_hash(tuple) {
            Some(h) => h,
            None => return Vec::new(),
        };
        match port {
            GroupPort::End => self.table.delete(&key_hash).map(|s| s.ring.into_iter().collect()).unwrap_or_default(),
            GroupPort::EndState | GroupPort::EndSingle => {
                if let Some(slot_guard) = self.table.find(&key_hash) {
                    let mut slot = slot_guard.lock();
                    let drained: Vec<Tuple> = slot.ring.drain(..).collect();
                    if port == GroupPort::EndState {
                        slot.last_common_hash = None;
                    }
                    drained
                } else {
                    Vec::new()
                }
            }
            GroupPort::Data | GroupPort::Expire => Vec::new(),
        }
    }

    /// One cooperative step of the walker: advances over one slot,
    /// bumping a loop counter. When a full loop completes, every slot
    /// whose `generation` didn't advance during that loop (i.e. it saw
    /// no events) is flushed - the "stale ring" cooperative eviction.
    pub fn expire_step(&mut self) -> Vec<Tuple> {
        let loop_before = self.walker.loop_count();
        let result = self.walker.next::<GroupeventsSlot>(&self.table);
        let mut out = Vec::new();
        if let Some((key_hash, slot_guard)) = result {
            let mut slot = slot_guard.lock();
            if slot.generation != self.current_generation {
                out.extend(slot.ring.drain(..));
                drop(slot);
                self.table.delete(&key_hash);
            }
        }
        if self.walker.loop_count() != loop_before {
            self.current_generation = self.current_generation.wrapping_add(1);
        }
        out
    }
}
