use crate::common::event_seconds;
use harness::{Harness, OperatorDescriptor};
use label::Label;
use record::Value;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

#[derive(Default)]
pub struct KeyrateSlot {
    epoch: Option<i64>,
    count: i64,
}

/// Per-key count-per-epoch, emitted (and reset) whenever the epoch
/// advances, gated to counts within `[min, max]` - grounded on
/// `original_source/src/procs/proc_keyrate.c`.
pub struct Keyrate {
    time_label: Option<Label>,
    epoch_seconds: f64,
    min: i64,
    max: i64,
    count_label: Label,
    pool: Arc<TuplePool>,
}

impl Keyrate {
    pub fn new(
        time_label: Option<Label>,
        epoch_seconds: f64,
        min: i64,
        max: i64,
        count_label: Label,
        pool: Arc<TuplePool>,
    ) -> Self {
        Keyrate {
            time_label,
            epoch_seconds: epoch_seconds.max(0.001),
            min,
            max,
            count_label,
            pool,
        }
    }
}

impl OperatorDescriptor for Keyrate {
    type Slot = KeyrateSlot;

    fn update(&mut self, slot: &mut KeyrateSlot, tuple: &Tuple, _key_hash: u64) -> bool {
        let now = event_seconds(tuple, self.time_label.as_ref());
        let epoch = (now / self.epoch_seconds).floor() as i64;

        let mut forward = false;
        if let Some(prev_epoch) = slot.epoch {
            if epoch != prev_epoch {
                if slot.count >= self.min && slot.count <= self.max {
                    let _ = tuple.add_member(
                        Record::scalar(Value::from(slot.count), vec![self.count_label.clone()]),
                        &self.pool.stats,
                    );
                    forward = true;
                }
                slot.count = 0;
            }
        }
        slot.epoch = Some(epoch);
        slot.count += 1;
        forward
    }
}

pub type KeyrateOp = Harness<Keyrate>;

#[cfg(test)]
mod tests {
    use super::*;
    use harness::Port;
    use label::Registry;
    use state::StateTable;
    use tuple::{Record, TuplePool};

    #[test]
    fn test_epoch_change_emits_within_thresholds() {
        let registry = Registry::new();
        let key = registry.register_indexed("KEY");
        let time_label = registry.register_indexed("T");
        let count_label = registry.register_indexed("COUNT");
        let pool = Arc::new(TuplePool::new());
        let table = Arc::new(StateTable::new(10));
        let mut op = Harness::new(
            Keyrate::new(Some(time_label.clone()), 1.0, 1, 10, count_label.clone(), Arc::clone(&pool)),
            table,
            vec![key.clone()],
            vec![],
            0,
        );

        let make = |t: f64| {
            let tup = Tuple::new(&pool, registry.index_len());
            tup.add_member(Record::scalar(Value::from("k"), vec![key.clone()]), &pool.stats)
                .unwrap();
            tup.add_member(
                Record::scalar(Value::Timestamp { sec: t as i64, usec: 0 }, vec![time_label.clone()]),
                &pool.stats,
            )
            .unwrap();
            tup
        };

        assert!(!op.process(Port::Data, &make(0.1)).forward);
        assert!(!op.process(Port::Data, &make(0.5)).forward);
        let third = make(1.2);
        let outcome = op.process(Port::Data, &third);
        assert!(outcome.forward);
        assert_eq!(third.find(&count_label)[0].as_value().unwrap().as_int(), Some(2));
    }
}
