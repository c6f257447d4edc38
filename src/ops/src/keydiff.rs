use harness::{Harness, OperatorDescriptor};
use label::Label;
use record::Value;
use std::sync::Arc;
use tuple::{Member, Record, Tuple, TuplePool};

#[derive(Default)]
pub struct KeydiffSlot {
    last: Option<f64>,
}

/// Per-key absolute first difference, attached as `DIFF`. The first
/// observation for a key has nothing to difference against, so it seeds
/// `last` and emits nothing - grounded on
/// `original_source/src/procs/proc_keydiff.c`.
pub struct Keydiff {
    diff_label: Label,
    pool: Arc<TuplePool>,
}

impl Keydiff {
    pub fn new(diff_label: Label, pool: Arc<TuplePool>) -> Self {
        Keydiff { diff_label, pool }
    }
}

impl OperatorDescriptor for Keydiff {
    type Slot = KeydiffSlot;

    fn update_value(
        &mut self,
        slot: &mut KeydiffSlot,
        tuple: &Tuple,
        _key_hash: u64,
        value: &Member,
    ) -> bool {
        let x = match value.as_value().and_then(|v| v.as_double()) {
            Some(x) => x,
            None => return false,
        };
        let forward = if let Some(last) = slot.last {
            let diff = (x - last).abs();
            let _ = tuple.add_member(
                Record::scalar(Value::from(diff), vec![self.diff_label.clone()]),
                &self.pool.stats,
            );
            true
        } else {
            false
        };
        slot.last = Some(x);
        forward
    }
}

pub type KeydiffOp = Harness<Keydiff>;

#[cfg(test)]
mod tests {
    use super::*;
    use harness::Port;
    use label::Registry;
    use state::StateTable;
    use tuple::{Record, TuplePool};

    #[test]
    fn test_first_observation_emits_nothing_second_emits_abs_diff() {
        let registry = Registry::new();
        let key = registry.register_indexed("KEY");
        let value = registry.register_indexed("VALUE");
        let diff_label = registry.register_indexed("DIFF");
        let pool = Arc::new(TuplePool::new());
        let table = Arc::new(StateTable::new(10));
        let mut op = Harness::new(
            Keydiff::new(diff_label.clone(), Arc::clone(&pool)),
            table,
            vec![key.clone()],
            vec![value.clone()],
            0,
        );

        let t1 = Tuple::new(&pool, registry.index_len());
        t1.add_member(Record::scalar(Value::from("k"), vec![key.clone()]), &pool.stats)
            .unwrap();
        t1.add_member(Record::scalar(Value::from(5.0), vec![value.clone()]), &pool.stats)
            .unwrap();
        assert!(!op.process(Port::Data, &t1).forward);

        let t2 = Tuple::new(&pool, registry.index_len());
        t2.add_member(Record::scalar(Value::from("k"), vec![key.clone()]), &pool.stats)
            .unwrap();
        t2.add_member(Record::scalar(Value::from(8.0), vec![value.clone()]), &pool.stats)
            .unwrap();
        assert!(op.process(Port::Data, &t2).forward);
        assert_eq!(t2.find(&diff_label)[0].as_value().unwrap().as_double(), Some(3.0));
    }
}
