use crate::common::event_seconds;
use harness::{Harness, OperatorDescriptor};
use label::Label;
use record::Value;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

const DEFAULT_THRESHOLD: u32 = 4;

#[derive(Default)]
pub struct PersistSlot {
    bitmap: u64,
    last_bin: Option<i64>,
}

/// Per-key presence bitmap over `bins` (`N <= 64`) successive time bins
/// of width `bin_width_ms`. Emits `(PERSIST, PERSIST_COUNT)` once the
/// popcount reaches `threshold` - grounded on
/// `original_source/src/procs/proc_persist.c`.
pub struct Persist {
    time_label: Option<Label>,
    bins: u32,
    bin_width_ms: f64,
    threshold: u32,
    persist_label: Label,
    persist_count_label: Label,
    pool: Arc<TuplePool>,
}

impl Persist {
    pub fn new(
        time_label: Option<Label>,
        bins: u32,
        bin_width_ms: f64,
        threshold: Option<u32>,
        persist_label: Label,
        persist_count_label: Label,
        pool: Arc<TuplePool>,
    ) -> Self {
        Persist {
            time_label,
            bins: bins.min(64).max(1),
            bin_width_ms: bin_width_ms.max(1.0),
            threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
            persist_label,
            persist_count_label,
            pool,
        }
    }

    fn bit_string(&self, bitmap: u64) -> String {
        (0..self.bins)
            .map(|i| if bitmap & (1 << i) != 0 { '1' } else { '0' })
            .collect()
    }
}

impl OperatorDescriptor for Persist {
    type Slot = PersistSlot;

    fn update(&mut self, slot: &mut PersistSlot, tuple: &Tuple, _key_hash: u64) -> bool {
        let now = event_seconds(tuple, self.time_label.as_ref());
        let bin = (now * 1000.0 / self.bin_width_ms).floor() as i64;

        match slot.last_bin {
            None => {
                slot.bitmap = 1;
            }
            Some(last_bin) => {
                let delta = bin - last_bin;
                if delta < 0 {
                    // Out-of-order event for an already-advanced key; ignore.
                    return false;
                }
                if delta as u32 >= self.bins {
                    slot.bitmap = 1;
                } else {
                    slot.bitmap = (slot.bitmap << delta) | 1;
                }
            }
        }
        slot.last_bin = Some(bin);

        let mask = if self.bins == 64 { u64::MAX } else { (1u64 << self.bins) - 1 };
        let masked = slot.bitmap & mask;
        let count = masked.count_ones();
        if count >= self.threshold {
            let _ = tuple.add_member(
                Record::scalar(Value::from(self.bit_string(masked)), vec![self.persist_label.clone()]),
                &self.pool.stats,
            );
            let _ = tuple.add_member(
                Record::scalar(Value::from(count as i64), vec![self.persist_count_label.clone()]),
                &self.pool.stats,
            );
            return true;
        }
        false
    }
}

pub type PersistOp = Harness<Persist>;

#[cfg(test)]
mod tests {
    use super::*;
    use harness::Port;
    use label::Registry;
    use state::StateTable;
    use tuple::{Record, TuplePool};

    #[test]
    fn test_persist_scenario_matches_expected_bitstring() {
        let registry = Registry::new();
        let key = registry.register_indexed("KEY");
        let time_label = registry.register_indexed("T");
        let persist_label = registry.register_indexed("PERSIST");
        let persist_count_label = registry.register_indexed("PERSIST_COUNT");
        let pool = Arc::new(TuplePool::new());
        let table = Arc::new(StateTable::new(10));
        let mut op = Harness::new(
            Persist::new(Some(time_label.clone()), 8, 1000.0, Some(3), persist_label.clone(), persist_count_label.clone(), Arc::clone(&pool)),
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
                Record::scalar(Value::Timestamp { sec: t as i64, usec: ((t.fract()) * 1_000_000.0).round() as i32 }, vec![time_label.clone()]),
                &pool.stats,
            )
            .unwrap();
            tup
        };

        let mut last = None;
        for t in [0.1, 1.2, 2.3, 3.4] {
            let tup = make(t);
            op.process(Port::Data, &tup);
            last = Some(tup);
        }
        let last = last.unwrap();
        assert_eq!(
            last.find(&persist_count_label)[0].as_value().unwrap().as_int(),
            Some(4)
        );
        assert_eq!(
            last.find(&persist_label)[0].as_value().unwrap().as_str(),
            Some("11110000")
        );
    }
}
