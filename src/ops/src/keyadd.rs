use harness::{Harness, OperatorDescriptor, Port};
use label::Label;
use record::Value;
use state::StateTable;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

/// Per-key `(count, sum)`, plus the first-seen key value so `flush`/
/// `expire` can rebuild an output tuple carrying the original key.
#[derive(Default)]
pub struct KeyaddSlot {
    key_value: Option<Value<'static>>,
    count: i64,
    sum: f64,
}

/// Per-key running counter and, when a value label is configured, sum.
/// Grounded on `original_source/src/procs/proc_keyadd.c`; emission
/// happens at `FLUSH` rather than per event (the harness's `update`/
/// `update_value` return `false`, so nothing is forwarded until
/// `KeyaddOp::flush` is called).
pub struct Keyadd {
    key_label: Label,
    key_only: bool,
}

impl Keyadd {
    fn touch(&self, slot: &mut KeyaddSlot, tuple: &Tuple) {
        if slot.key_value.is_none() {
            if let Some(key_member) = tuple.find(&self.key_label).into_iter().next() {
                slot.key_value = key_member.as_value().map(|v| v.as_static());
            }
        }
        slot.count += 1;
    }
}

impl OperatorDescriptor for Keyadd {
    type Slot = KeyaddSlot;

    fn update(&mut self, slot: &mut KeyaddSlot, tuple: &Tuple, _key_hash: u64) -> bool {
        self.touch(slot, tuple);
        false
    }

    fn update_value(
        &mut self,
        slot: &mut KeyaddSlot,
        tuple: &Tuple,
        _key_hash: u64,
        value: &tuple::Member,
    ) -> bool {
        self.touch(slot, tuple);
        if let Some(v) = value.as_value().and_then(|v| v.as_double()) {
            slot.sum += v;
        }
        false
    }
}

/// Wraps the harness to add `-P` (percentage-of-total) post-processing,
/// which needs visibility across every key's sum at once - something no
/// single slot's `flush` callback can see.
pub struct KeyaddOp {
    harness: Harness<Keyadd>,
    pool: Arc<TuplePool>,
    index_len: u32,
    key_label: Label,
    count_label: Label,
    sum_label: Label,
    percent_label: Option<Label>,
    key_only: bool,
}

impl KeyaddOp {
    pub fn new(
        table: Arc<StateTable<u64, KeyaddSlot>>,
        pool: Arc<TuplePool>,
        index_len: u32,
        key_label: Label,
        value_labels: Vec<Label>,
        count_label: Label,
        sum_label: Label,
        percent_label: Option<Label>,
        key_only: bool,
    ) -> Self {
        let descriptor = Keyadd {
            key_label: key_label.clone(),
            key_only,
        };
        let harness = Harness::new(descriptor, table, vec![key_label.clone()], value_labels, 0);
        KeyaddOp {
            harness,
            pool,
            index_len,
            key_label,
            count_label,
            sum_label,
            percent_label,
            key_only,
        }
    }

    pub fn process(&mut self, tuple: &Tuple) {
        self.harness.process(Port::Data, tuple);
    }

    pub fn flush(&mut self) -> Vec<Tuple> {
        let table = Arc::clone(self.harness.table());
        let mut rows: Vec<(Option<Value<'static>>, i64, f64)> = Vec::new();
        table.scour_and_flush(|_k, slot| rows.push((slot.key_value, slot.count, slot.sum)));

        let total_count: i64 = rows.iter().map(|(_, count, _)| count).sum();
        let mut out = Vec::with_capacity(rows.len());
        for (key_value, count, sum) in rows {
            let t = Tuple::new(&self.pool, self.index_len);
            if let Some(kv) = key_value {
                let _ = t.add_member(Record::scalar(kv, vec![self.key_label.clone()]), &self.pool.stats);
            }
            if !self.key_only {
                let _ = t.add_member(
                    Record::scalar(Value::from(count), vec![self.count_label.clone()]),
                    &self.pool.stats,
                );
                let _ = t.add_member(
                    Record::scalar(Value::from(sum), vec![self.sum_label.clone()]),
                    &self.pool.stats,
                );
                if let Some(pct_label) = &self.percent_label {
                    // Count-of-total-count, not sum-of-total-sum - matches
                    // `proc_keyadd.c`'s `cnt / proc->totalcnt`.
                    let pct = if total_count != 0 { 100.0 * count as f64 / total_count as f64 } else { 0.0 };
                    let _ = t.add_member(
                        Record::scalar(Value::from(pct), vec![pct_label.clone()]),
                        &self.pool.stats,
                    );
                }
            }
            out.push(t);
        }
        out
    }
}

/// Emits exactly once, the moment a key's count reaches `threshold` -
/// grounded on `proc_keyadd_initial.c`'s one-shot variant, implemented
/// via the harness's `force_expire` hook instead of a separate flush
/// pass.
pub struct KeyaddInitial {
    key_label: Label,
    out_label: Label,
    threshold: i64,
    pool: Arc<TuplePool>,
    index_len: u32,
}

impl KeyaddInitial {
    pub fn new(
        key_label: Label,
        out_label: Label,
        threshold: i64,
        pool: Arc<TuplePool>,
        index_len: u32,
    ) -> Self {
        KeyaddInitial {
            key_label,
            out_label,
            threshold,
            pool,
            index_len,
        }
    }
}

impl OperatorDescriptor for KeyaddInitial {
    type Slot = KeyaddSlot;

    fn update(&mut self, slot: &mut KeyaddSlot, tuple: &Tuple, _key_hash: u64) -> bool {
        if slot.key_value.is_none() {
            if let Some(key_member) = tuple.find(&self.key_label).into_iter().next() {
                slot.key_value = key_member.as_value().map(|v| v.as_static());
            }
        }
        slot.count += 1;
        false
    }

    fn force_expire(&mut self, slot: &KeyaddSlot, _tuple: &Tuple, _key_hash: u64) -> bool {
        slot.count == self.threshold
    }

    fn expire(&mut self, slot: &KeyaddSlot, _key_hash: u64, out: &mut Vec<Tuple>) {
        let t = Tuple::new(&self.pool, self.index_len);
        if let Some(kv) = slot.key_value.clone() {
            let _ = t.add_member(Record::scalar(kv, vec![self.key_label.clone()]), &self.pool.stats);
        }
        let _ = t.add_member(
            Record::scalar(Value::from(slot.count), vec![self.out_label.clone()]),
            &self.pool.stats,
        );
        out.push(t);
    }
}

pub type KeyaddInitialOp = Harness<KeyaddInitial>;

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;

    #[test]
    fn test_keyadd_flush_emits_count_and_sum_per_key() {
        let registry = Registry::new();
        let key = registry.register_indexed("K");
        let value = registry.register_indexed("V");
        let count_label = registry.register_indexed("COUNT");
        let sum_label = registry.register_indexed("SUM");
        let pool = Arc::new(TuplePool::new());
        let table = Arc::new(StateTable::new(10));

        let mut op = KeyaddOp::new(
            table,
            Arc::clone(&pool),
            registry.index_len(),
            key.clone(),
            vec![value.clone()],
            count_label.clone(),
            sum_label.clone(),
            None,
            false,
        );

        for (k, v) in [(1i64, 10i64), (1, 5), (2, 7)] {
            let t = Tuple::new(&pool, registry.index_len());
            t.add_member(Record::scalar(Value::from(k), vec![key.clone()]), &pool.stats)
                .unwrap();
            t.add_member(Record::scalar(Value::from(v), vec![value.clone()]), &pool.stats)
                .unwrap();
            op.process(&t);
        }

        let mut results: Vec<(i64, i64, f64)> = op
            .flush()
            .iter()
            .map(|t| {
                let k = t.find(&key)[0].as_value().unwrap().as_int().unwrap();
                let c = t.find(&count_label)[0].as_value().unwrap().as_int().unwrap();
                let s = t.find(&sum_label)[0].as_value().unwrap().as_double().unwrap();
                (k, c, s)
            })
            .collect();
        results.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(results, vec![(1, 2, 15.0), (2, 1, 7.0)]);
    }
}
