use harness::{Harness, OperatorDescriptor};
use rand::Rng;
use tuple::Tuple;

/// Per-key exponential backoff sampler: state is a 16-bit exponent `e`,
/// and each event passes with probability `1/base^e`, incrementing `e`
/// on a pass. Base 2 (the default) takes an integer `1 << e` fast path
/// instead of `powf`, matching the implementation choice recorded for
/// this operator in `DESIGN.md`.
pub struct Countfilter {
    base: f64,
}

#[derive(Default, Clone, Copy)]
pub struct CountfilterSlot {
    e: u32,
}

impl Countfilter {
    pub fn new(base: f64) -> Self {
        Countfilter { base }
    }
}

impl OperatorDescriptor for Countfilter {
    type Slot = CountfilterSlot;

    fn update(&mut self, slot: &mut CountfilterSlot, _tuple: &Tuple, _key_hash: u64) -> bool {
        let shift = slot.e.min(62);
        let pass = if (self.base - 2.0).abs() < f64::EPSILON {
            let denom = 1u64 << shift;
            rand::thread_rng().gen_range(0..denom) == 0
        } else {
            let prob = 1.0 / self.base.powi(shift as i32);
            rand::thread_rng().gen::<f64>() < prob
        };
        if pass {
            slot.e = slot.e.saturating_add(1);
        }
        pass
    }
}

pub type CountfilterOp = Harness<Countfilter>;

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;
    use state::StateTable;
    use std::sync::Arc;
    use tuple::{Record, TuplePool};

    #[test]
    fn test_first_event_always_passes() {
        let registry = Registry::new();
        let key = registry.register_indexed("KEY");
        let table = Arc::new(StateTable::new(10));
        let mut op = Harness::new(Countfilter::new(2.0), table, vec![key.clone()], vec![], 0);

        let pool = Arc::new(TuplePool::new());
        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(record::Value::from("k"), vec![key]), &pool.stats)
            .unwrap();
        let outcome = op.process(harness::Port::Data, &input);
        assert!(outcome.forward);
    }
}
