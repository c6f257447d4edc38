use crate::common::emit_member;
use label::Label;
use record::Value;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Gt,
    Eq,
}

impl Comparator {
    fn holds(self, len: i64, threshold: i64) -> bool {
        match self {
            Comparator::Lt => len < threshold,
            Comparator::Gt => len > threshold,
            Comparator::Eq => len == threshold,
        }
    }
}

/// Emits a buffer's length as `STRLEN`, optionally gated by a
/// `</>/=` comparison against a threshold - grounded on
/// `original_source/src/procs/proc_strlen.c`'s `-g`/`-l`/`-e` flags.
pub struct Strlen {
    target_label: Label,
    out_label: Label,
    gate: Option<(Comparator, i64)>,
}

impl Strlen {
    pub fn new(target_label: Label, out_label: Label, gate: Option<(Comparator, i64)>) -> Self {
        Strlen {
            target_label,
            out_label,
            gate,
        }
    }

    pub fn process(&self, input: &Tuple, pool: &Arc<TuplePool>) -> Option<Tuple> {
        let member = input.find(&self.target_label).into_iter().next()?;
        let len = member.as_value().and_then(|v| v.as_bytes())?.len() as i64;
        if let Some((cmp, threshold)) = self.gate {
            if !cmp.holds(len, threshold) {
                return None;
            }
        }
        let out = Record::scalar(Value::from(len), vec![self.out_label.clone()]);
        Some(emit_member(input, pool, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;

    fn setup() -> (Registry, Label, Label) {
        let registry = Registry::new();
        let target = registry.register_indexed("BUF");
        let out = registry.register_indexed("STRLEN");
        (registry, target, out)
    }

    #[test]
    fn test_emits_when_gate_satisfied() {
        let (registry, target, out) = setup();
        let strlen = Strlen::new(target.clone(), out.clone(), Some((Comparator::Gt, 3)));
        let pool = Arc::new(TuplePool::new());
        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(Value::from("abcd"), vec![target]), &pool.stats)
            .unwrap();
        let result = strlen.process(&input, &pool).unwrap();
        assert_eq!(result.find(&out)[0].as_value().unwrap().as_int(), Some(4));
    }

    #[test]
    fn test_no_output_when_gate_fails() {
        let (registry, target, out) = setup();
        let strlen = Strlen::new(target.clone(), out, Some((Comparator::Gt, 3)));
        let pool = Arc::new(TuplePool::new());
        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(Value::from("ab"), vec![target]), &pool.stats)
            .unwrap();
        assert!(strlen.process(&input, &pool).is_none());
    }
}
