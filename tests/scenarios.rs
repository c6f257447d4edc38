//! Cross-crate scenario tests, one per concrete input/output case
//! described for the operator catalogue: a small known stream of
//! tuples in, specific labelled members out. Mirrors the teacher's
//! `tests/building_blocks/` directory of cross-crate scenario tests,
//! just built against operators instead of SQL statements.

use harness::{Harness, Port};
use label::Registry;
use ops::keyadd::KeyaddOp;
use ops::keydiff::Keydiff;
use ops::keysort::Keysort;
use ops::persist::Persist;
use ops::{charcnt, strlen};
use record::Value;
use state::StateTable;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

#[test]
fn scenario_charcnt_counts_matching_bytes() {
    let registry = Registry::new();
    let target = registry.register_indexed("BUF");
    let out = registry.register_indexed("CHARCNT");
    let pool = Arc::new(TuplePool::new());
    let op = charcnt::Charcnt::new("3d", target.clone(), out.clone()).unwrap();

    let input = Tuple::new(&pool, registry.index_len());
    input
        .add_member(Record::scalar(Value::from("a=b=c"), vec![target]), &pool.stats)
        .unwrap();

    let result = op.process(&input, &pool);
    assert_eq!(result.find(&out)[0].as_value().unwrap().as_int(), Some(2));
}

#[test]
fn scenario_strlen_gates_on_length() {
    let registry = Registry::new();
    let target = registry.register_indexed("BUF");
    let out = registry.register_indexed("STRLEN");
    let pool = Arc::new(TuplePool::new());
    let op = strlen::Strlen::new(target.clone(), out.clone(), Some((strlen::Comparator::Gt, 3)));

    let long = Tuple::new(&pool, registry.index_len());
    long.add_member(Record::scalar(Value::from("abcd"), vec![target.clone()]), &pool.stats)
        .unwrap();
    let result = op.process(&long, &pool).expect("length 4 > 3 should pass the gate");
    assert_eq!(result.find(&out)[0].as_value().unwrap().as_int(), Some(4));

    let short = Tuple::new(&pool, registry.index_len());
    short
        .add_member(Record::scalar(Value::from("ab"), vec![target]), &pool.stats)
        .unwrap();
    assert!(op.process(&short, &pool).is_none(), "length 2 should not pass `> 3`");
}

#[test]
fn scenario_keyadd_sums_and_counts_per_key() {
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
        t.add_member(Record::scalar(Value::from(k), vec![key.clone()]), &pool.stats).unwrap();
        t.add_member(Record::scalar(Value::from(v), vec![value.clone()]), &pool.stats).unwrap();
        op.process(&t);
    }

    let mut rows: Vec<(i64, i64, f64)> = op
        .flush()
        .iter()
        .map(|t| {
            (
                t.find(&key)[0].as_value().unwrap().as_int().unwrap(),
                t.find(&count_label)[0].as_value().unwrap().as_int().unwrap(),
                t.find(&sum_label)[0].as_value().unwrap().as_double().unwrap(),
            )
        })
        .collect();
    rows.sort_by_key(|(k, ..)| *k);
    assert_eq!(rows, vec![(1, 2, 15.0), (2, 1, 7.0)]);
}

#[test]
fn scenario_keydiff_emits_absolute_difference_from_second_event_onward() {
    let registry = Registry::new();
    let key = registry.register_indexed("K");
    let value = registry.register_indexed("V");
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

    let make = |v: f64| {
        let t = Tuple::new(&pool, registry.index_len());
        t.add_member(Record::scalar(Value::from("A"), vec![key.clone()]), &pool.stats).unwrap();
        t.add_member(Record::scalar(Value::from(v), vec![value.clone()]), &pool.stats).unwrap();
        t
    };

    let first = make(10.0);
    assert!(!op.process(Port::Data, &first).forward);

    let second = make(13.0);
    assert!(op.process(Port::Data, &second).forward);
    assert_eq!(second.find(&diff_label)[0].as_value().unwrap().as_double(), Some(3.0));

    let third = make(8.0);
    assert!(op.process(Port::Data, &third).forward);
    assert_eq!(third.find(&diff_label)[0].as_value().unwrap().as_double(), Some(5.0));
}

#[test]
fn scenario_persist_reaches_threshold_on_fourth_event() {
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
        tup.add_member(Record::scalar(Value::from("k"), vec![key.clone()]), &pool.stats).unwrap();
        tup.add_member(
            Record::scalar(
                Value::Timestamp { sec: t as i64, usec: (t.fract() * 1_000_000.0).round() as i32 },
                vec![time_label.clone()],
            ),
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
    assert_eq!(last.find(&persist_count_label)[0].as_value().unwrap().as_int(), Some(4));
    assert_eq!(last.find(&persist_label)[0].as_value().unwrap().as_str(), Some("11110000"));
}

#[test]
fn scenario_keysort_emits_stale_then_drains_sorted_window() {
    let registry = Registry::new();
    let key = registry.register_indexed("KEY");
    let value = registry.register_indexed("VALUE");
    let pool = Arc::new(TuplePool::new());
    let op = Keysort::new(key.clone(), value.clone(), 3, 10, 0);

    let make = |v: i64| {
        let tup = Tuple::new(&pool, registry.index_len());
        tup.add_member(Record::scalar(Value::from("k"), vec![key.clone()]), &pool.stats).unwrap();
        tup.add_member(Record::scalar(Value::from(v), vec![value.clone()]), &pool.stats).unwrap();
        tup
    };
    let read = |t: &Tuple| t.find(&value)[0].as_value().unwrap().as_int().unwrap();

    let mut emitted = Vec::new();
    for v in [5, 3, 8, 2, 10] {
        if let Some(out) = op.process(&make(v)) {
            emitted.push(read(&out));
        }
    }
    emitted.sort();
    assert_eq!(emitted, vec![2, 3]);

    let mut drained: Vec<i64> = op.drain_all().iter().map(read).collect();
    drained.sort();
    assert_eq!(drained, vec![5, 8, 10]);
}
