use label::NestedLabelSet;
use std::collections::HashSet;
use std::sync::Arc;
use tuple::{Tuple, TuplePool};

/// Produces a deep copy of a tuple with every member matched by a
/// nested-label set excluded, grounded on
/// `original_source/src/procs/proc_removenest.c`.
///
/// The exclusion set is rebuilt per input record rather than cleared
/// (`generation` just lets the pointer set's backing `HashMap`/`Vec`
/// stay allocated across calls without an explicit `clear()`) -
/// mirrors the "small per-invocation hash set of (generation, pointer)
/// pairs" design note, simplified to a fresh `HashSet` per call since a
/// generation counter buys nothing once the set is owned locally
/// instead of cached on the operator.
pub struct Removenest {
    excluded: NestedLabelSet,
}

impl Removenest {
    pub fn new(excluded: NestedLabelSet) -> Self {
        Removenest { excluded }
    }

    pub fn process(&self, input: &Tuple, pool: &Arc<TuplePool>) -> Tuple {
        let mut exclude = HashSet::new();
        input.nested_search(&self.excluded, &mut |member| {
            exclude.insert(Arc::as_ptr(member) as usize);
        });
        input.deep_copy_filtered(pool, &exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;
    use record::Value;
    use tuple::Record;

    #[test]
    fn test_excludes_matched_member_keeps_rest() {
        let registry = Registry::new();
        let keep = registry.register_indexed("KEEP");
        let drop_label = registry.register_indexed("DROP");
        let pool = Arc::new(TuplePool::new());

        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(Value::from(1i64), vec![keep.clone()]), &pool.stats)
            .unwrap();
        input
            .add_member(Record::scalar(Value::from(2i64), vec![drop_label.clone()]), &pool.stats)
            .unwrap();

        let excluded = registry.parse_path("DROP").unwrap();
        let op = Removenest::new(excluded);
        let out = op.process(&input, &pool);

        assert_eq!(out.find(&keep).len(), 1);
        assert_eq!(out.find(&drop_label).len(), 0);
    }

    #[test]
    fn test_empty_label_set_is_identity() {
        let registry = Registry::new();
        let keep = registry.register_indexed("KEEP");
        let pool = Arc::new(TuplePool::new());

        let input = Tuple::new(&pool, registry.index_len());
        input
            .add_member(Record::scalar(Value::from(1i64), vec![keep.clone()]), &pool.stats)
            .unwrap();

        let op = Removenest::new(NestedLabelSet::default());
        let out = op.process(&input, &pool);
        assert_eq!(out.find(&keep).len(), 1);
    }
}
