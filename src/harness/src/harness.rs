use crate::descriptor::OperatorDescriptor;
use crate::port::Port;
use label::Label;
use state::{StateTable, Walker};
use std::sync::Arc;
use tuple::Tuple;

/// What came out of one `Harness::process` call.
#[derive(Default)]
pub struct HarnessOutcome {
    /// Whether the input tuple should be forwarded downstream -
    /// non-zero/`true` return from `update`/`update_value`/
    /// `update_value_index` per spec.md's dispatch contract.
    pub forward: bool,
    /// Tuples emitted by `expire`/`flush` during this call.
    pub emitted: Vec<Tuple>,
}

/// Binds an [`OperatorDescriptor`] to a keyed state table and implements
/// the dispatch loop every `ops::` keyed operator runs through: locate
/// key members by label, look up (or create) their slot, and drive the
/// descriptor's single/value/multi-value update path.
pub struct Harness<D: OperatorDescriptor> {
    descriptor: D,
    table: Arc<StateTable<u64, D::Slot>>,
    key_labels: Vec<Label>,
    value_labels: Vec<Label>,
    walker: Walker<u64>,
    seed: u64,
}

impl<D: OperatorDescriptor> Harness<D> {
    pub fn new(
        descriptor: D,
        table: Arc<StateTable<u64, D::Slot>>,
        key_labels: Vec<Label>,
        value_labels: Vec<Label>,
        seed: u64,
    ) -> Self {
        let mut harness = Harness {
            descriptor,
            table,
            key_labels,
            value_labels,
            walker: Walker::new(),
            seed,
        };
        harness.descriptor.init();
        harness
    }

    pub fn descriptor_mut(&mut self) -> &mut D {
        &mut self.descriptor
    }

    pub fn table(&self) -> &Arc<StateTable<u64, D::Slot>> {
        &self.table
    }

    pub fn process(&mut self, port: Port, tuple: &Tuple) -> HarnessOutcome {
        match port {
            Port::Data => self.process_data(tuple),
            Port::Expire => self.process_expire(),
            Port::Delete | Port::Remove => self.process_delete(tuple),
            Port::Flush => self.process_flush(),
        }
    }

    fn key_hash(&self, key_member: &tuple::Member) -> u64 {
        let mut acc = self.seed;
        key_member.mix_hash(self.seed, &mut acc);
        acc
    }

    fn process_data(&mut self, tuple: &Tuple) -> HarnessOutcome {
        let mut outcome = HarnessOutcome::default();
        let key_labels = self.key_labels.clone();
        for key_label in &key_labels {
            for key_member in tuple.find(key_label) {
                let key_hash = self.key_hash(&key_member);
                let slot_guard = self.table.find_attach(key_hash);
                let mut slot = slot_guard.lock();

                if self.value_labels.is_empty() {
                    if self.descriptor.update(&mut slot, tuple, key_hash) {
                        outcome.forward = true;
                    }
                } else if self.value_labels.len() == 1 {
                    for value in tuple.find(&self.value_labels[0]) {
                        if self
                            .descriptor
                            .update_value(&mut slot, tuple, key_hash, &value)
                        {
                            outcome.forward = true;
                        }
                    }
                } else {
                    let mut values = Vec::new();
                    for label in &self.value_labels {
                        values.extend(tuple.find(label));
                    }
                    self.descriptor.init_mvalue(&mut slot, values.len());
                    for (index, value) in values.iter().enumerate() {
                        if self.descriptor.update_value_index(
                            &mut slot, tuple, key_hash, value, index,
                        ) {
                            outcome.forward = true;
                        }
                    }
                    self.descriptor.post_update_mvalue(&mut slot, tuple, key_hash);
                }

                if self.descriptor.force_expire(&slot, tuple, key_hash) {
                    self.descriptor.expire(&slot, key_hash, &mut outcome.emitted);
                    drop(slot);
                    self.table.delete(&key_hash);
                }
            }
        }
        outcome
    }

    fn process_expire(&mut self) -> HarnessOutcome {
        let mut outcome = HarnessOutcome::default();
        if !self.descriptor.gradual_expire() {
            return outcome;
        }
        if let Some((key_hash, slot_guard)) = self.walker.next(&self.table) {
            let slot = slot_guard.lock();
            self.descriptor.expire(&slot, key_hash, &mut outcome.emitted);
        }
        outcome
    }

    fn process_delete(&mut self, tuple: &Tuple) -> HarnessOutcome {
        let mut outcome = HarnessOutcome::default();
        let key_labels = self.key_labels.clone();
        for key_label in &key_labels {
            for key_member in tuple.find(key_label) {
                let key_hash = self.key_hash(&key_member);
                if let Some(slot_guard) = self.table.find(&key_hash) {
                    let slot = slot_guard.lock();
                    self.descriptor.expire(&slot, key_hash, &mut outcome.emitted);
                }
                self.table.delete(&key_hash);
            }
        }
        outcome
    }

    fn process_flush(&mut self) -> HarnessOutcome {
        let mut emitted = Vec::new();
        let descriptor = &mut self.descriptor;
        self.table.scour_and_flush(|key_hash, slot| {
            descriptor.flush(&slot, key_hash, &mut emitted);
        });
        HarnessOutcome {
            forward: false,
            emitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;
    use record::Value;
    use std::sync::Arc;
    use tuple::{Record, TuplePool};

    #[derive(Default)]
    struct CountSlot {
        count: i64,
    }

    struct Counter;

    impl OperatorDescriptor for Counter {
        type Slot = CountSlot;

        fn update(&mut self, slot: &mut CountSlot, _tuple: &Tuple, _key_hash: u64) -> bool {
            slot.count += 1;
            true
        }

        fn expire(&mut self, slot: &CountSlot, _key_hash: u64, out: &mut Vec<Tuple>) {
            let pool = Arc::new(TuplePool::new());
            let t = Tuple::new(&pool, 0);
            let _ = t.add_member(Record::scalar(Value::from(slot.count), vec![]), &pool.stats);
            out.push(t);
        }
    }

    #[test]
    fn test_update_counts_per_key() {
        let registry = Registry::new();
        let key_label = registry.register_indexed("KEY");
        let table = Arc::new(StateTable::new(10));
        let mut harness = Harness::new(Counter, table, vec![key_label.clone()], vec![], 0);

        let pool = Arc::new(TuplePool::new());
        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(Value::from("a"), vec![key_label]), &pool.stats)
            .unwrap();

        let outcome = harness.process(Port::Data, &input);
        assert!(outcome.forward);

        let outcome2 = harness.process(Port::Data, &input);
        assert!(outcome2.forward);

        let flushed = harness.process(Port::Flush, &input);
        assert_eq!(flushed.emitted.len(), 1);
    }
}
