use crate::args::*;
use harness::{Harness, Port};
use label::{Label, Registry};
use ops::countfilter::{Countfilter, CountfilterOp};
use ops::keyadd::{Keyadd, KeyaddInitial, KeyaddInitialOp, KeyaddOp};
use ops::keydiff::{Keydiff, KeydiffOp};
use ops::keyewma::{Keyewma, KeyewmaOp};
use ops::keyrate::{Keyrate, KeyrateOp};
use ops::keytrans::{Keytrans, KeytransOp};
use ops::periodic::{Periodic, PeriodicOp};
use ops::persist::{Persist, PersistOp};
use ops::strlen::Comparator;
use ops::{charcnt, duplicates, groupevents, keysort, removenest, strlen, OpsError};
use state::StateTable;
use std::sync::Arc;
use tuple::{Tuple, TuplePool};

fn first_label(registry: &Registry, labels: &[String]) -> Result<Label, OpsError> {
    labels
        .first()
        .map(|name| registry.register_indexed(name))
        .ok_or_else(|| OpsError::MissingLabel("expected at least one positional label".into()))
}

fn optional_label(registry: &Registry, name: &Option<String>, default: &str) -> Label {
    match name {
        Some(n) => registry.register_indexed(n),
        None => registry.register_indexed(default),
    }
}

fn opt_time_label(registry: &Registry, name: &Option<String>) -> Option<Label> {
    name.as_ref().map(|n| registry.register_indexed(n))
}

/// A constructed operator instance ready to process tuples one at a
/// time. Wraps every `ops::` type behind a single interface since their
/// native `process` signatures differ (some return `Tuple`, some
/// `Option<Tuple>`, some `Vec<Tuple>`, some a `harness::HarnessOutcome`)
/// - the uniform point `main.rs`'s stdin loop drives against.
pub enum BuiltOperator {
    Charcnt(charcnt::Charcnt),
    Strlen(strlen::Strlen),
    Duplicates(duplicates::Duplicates),
    Countfilter(CountfilterOp),
    Keyadd(KeyaddOp),
    KeyaddInitial(KeyaddInitialOp),
    Keyewma(KeyewmaOp),
    Keydiff(KeydiffOp),
    Keyrate(KeyrateOp),
    Keytrans(KeytransOp),
    Periodic(PeriodicOp),
    Persist(PersistOp),
    Groupevents(groupevents::Groupevents),
    Keysort(keysort::Keysort),
    Removenest(removenest::Removenest),
}

impl BuiltOperator {
    pub fn process(&mut self, input: &Tuple, pool: &Arc<TuplePool>) -> Vec<Tuple> {
        match self {
            BuiltOperator::Charcnt(op) => vec![op.process(input, pool)],
            BuiltOperator::Strlen(op) => op.process(input, pool).into_iter().collect(),
            BuiltOperator::Duplicates(op) => vec![op.process(input, pool)],
            BuiltOperator::Countfilter(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Keyadd(op) => {
                op.process(input);
                Vec::new()
            }
            BuiltOperator::KeyaddInitial(op) => op.process(Port::Data, input).emitted,
            BuiltOperator::Keyewma(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Keydiff(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Keyrate(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Keytrans(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Periodic(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Persist(op) => forward_if(op.process(Port::Data, input), input),
            BuiltOperator::Groupevents(op) => op.process(input),
            BuiltOperator::Keysort(op) => op.process(input).into_iter().collect(),
            BuiltOperator::Removenest(op) => vec![op.process(input, pool)],
        }
    }

    /// Drains accumulated state at end-of-stream; most operators forward
    /// as they go and have nothing left to flush.
    pub fn flush(&mut self, pool: &Arc<TuplePool>) -> Vec<Tuple> {
        let placeholder = Tuple::new(pool, 0);
        match self {
            BuiltOperator::Keyadd(op) => op.flush(),
            BuiltOperator::Keysort(op) => op.drain_all(),
            BuiltOperator::Countfilter(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Keyewma(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Keydiff(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Keyrate(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Keytrans(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Periodic(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::Persist(op) => op.process(Port::Flush, &placeholder).emitted,
            BuiltOperator::KeyaddInitial(op) => op.process(Port::Flush, &placeholder).emitted,
            _ => Vec::new(),
        }
    }
}

fn forward_if(outcome: harness::HarnessOutcome, input: &Tuple) -> Vec<Tuple> {
    let mut out = outcome.emitted;
    if outcome.forward {
        out.push(input.clone());
    }
    out
}

pub fn build(
    registry: &Registry,
    pool: &Arc<TuplePool>,
    operator: &Operator,
) -> Result<BuiltOperator, OpsError> {
    Ok(match operator {
        Operator::Charcnt(args) => {
            let target = first_label(registry, &args.common.labels)?;
            let out = optional_label(registry, &args.common.out_label, "CHARCNT");
            BuiltOperator::Charcnt(charcnt::Charcnt::new(&args.dict, target, out)?)
        }
        Operator::Strlen(args) => {
            let target = first_label(registry, &args.common.labels)?;
            let out = optional_label(registry, &args.common.out_label, "STRLEN");
            let gate = match (&args.comparator, args.threshold) {
                (Some(c), Some(t)) => {
                    let cmp = match c.as_str() {
                        "<" => Comparator::Lt,
                        ">" => Comparator::Gt,
                        "=" => Comparator::Eq,
                        other => return Err(OpsError::InvalidOption(format!("unknown comparator {}", other))),
                    };
                    Some((cmp, t))
                }
                _ => None,
            };
            BuiltOperator::Strlen(strlen::Strlen::new(target, out, gate))
        }
        Operator::Duplicates(args) => {
            let target = first_label(registry, &args.common.labels)?;
            let dup = registry.register_indexed(&args.dup_label);
            let unique = args.unique_label.as_ref().map(|n| registry.register_indexed(n));
            BuiltOperator::Duplicates(duplicates::Duplicates::new(target, dup, unique, args.rotate_after))
        }
        Operator::Countfilter(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Countfilter(Harness::new(Countfilter::new(args.base), table, vec![key], Vec::new(), 0))
        }
        Operator::Keyadd(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let values: Vec<Label> = args.common.value_label.iter().map(|n| registry.register_indexed(n)).collect();
            let count_label = optional_label(registry, &args.common.out_label, "COUNT");
            let table = Arc::new(StateTable::new(args.common.table_size));
            if let Some(threshold) = args.initial_threshold {
                let descriptor = KeyaddInitial::new(key.clone(), count_label, threshold, Arc::clone(pool), registry.index_len());
                BuiltOperator::KeyaddInitial(Harness::new(descriptor, table, vec![key], Vec::new(), 0))
            } else {
                let sum_label = registry.register_indexed("SUM");
                let percent_label = if args.percent { Some(registry.register_indexed("PERCENT")) } else { None };
                BuiltOperator::Keyadd(KeyaddOp::new(
                    table,
                    Arc::clone(pool),
                    registry.index_len(),
                    key,
                    values,
                    count_label,
                    sum_label,
                    percent_label,
                    args.key_only,
                ))
            }
        }
        Operator::Keyewma(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let value = args
                .common
                .value_label
                .first()
                .map(|n| registry.register_indexed(n))
                .ok_or_else(|| OpsError::MissingLabel("keyewma requires -V".into()))?;
            let mean = optional_label(registry, &args.common.out_label, "MEAN");
            let variance = registry.register_indexed("VARIANCE");
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Keyewma(Harness::new(
                Keyewma::new(args.alpha, mean, variance, Arc::clone(pool)),
                table,
                vec![key],
                vec![value],
                0,
            ))
        }
        Operator::Keydiff(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let value = args
                .common
                .value_label
                .first()
                .map(|n| registry.register_indexed(n))
                .ok_or_else(|| OpsError::MissingLabel("keydiff requires -V".into()))?;
            let diff = optional_label(registry, &args.common.out_label, "DIFF");
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Keydiff(Harness::new(Keydiff::new(diff, Arc::clone(pool)), table, vec![key], vec![value], 0))
        }
        Operator::Keyrate(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let time_label = opt_time_label(registry, &args.time_label);
            let count = optional_label(registry, &args.common.out_label, "COUNT");
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Keyrate(Harness::new(
                Keyrate::new(time_label, args.epoch_seconds, args.min, args.max, count, Arc::clone(pool)),
                table,
                vec![key],
                Vec::new(),
                0,
            ))
        }
        Operator::Keytrans(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let time_label = opt_time_label(registry, &args.time_label);
            let out = optional_label(registry, &args.common.out_label, "TRANS");
            let values: Vec<Label> = args.common.value_label.iter().map(|n| registry.register_indexed(n)).collect();
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Keytrans(Harness::new(Keytrans::new(time_label, out, Arc::clone(pool)), table, vec![key], values, 0))
        }
        Operator::Periodic(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let time_label = opt_time_label(registry, &args.time_label);
            let period = registry.register_indexed("PERIOD");
            let period_count = registry.register_indexed("PERIOD_COUNT");
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Periodic(Harness::new(
                Periodic::new(time_label, args.bins, args.min_tdiff_ms, args.max_tdiff_ms, period, period_count, Arc::clone(pool)),
                table,
                vec![key],
                Vec::new(),
                0,
            ))
        }
        Operator::Persist(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let time_label = opt_time_label(registry, &args.time_label);
            let persist = registry.register_indexed("PERSIST");
            let persist_count = registry.register_indexed("PERSIST_COUNT");
            let table = Arc::new(StateTable::new(args.common.table_size));
            BuiltOperator::Persist(Harness::new(
                Persist::new(time_label, args.bins, args.bin_width_ms as f64, Some(args.threshold), persist, persist_count, Arc::clone(pool)),
                table,
                vec![key],
                Vec::new(),
                0,
            ))
        }
        Operator::Groupevents(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let common_labels: Vec<Label> = args.common_label.iter().map(|n| registry.register_indexed(n)).collect();
            BuiltOperator::Groupevents(groupevents::Groupevents::new(key, common_labels, args.max_values, args.common.table_size, 0))
        }
        Operator::Keysort(args) => {
            let key = first_label(registry, &args.common.labels)?;
            let value = args
                .common
                .value_label
                .first()
                .map(|n| registry.register_indexed(n))
                .ok_or_else(|| OpsError::MissingLabel("keysort requires -V".into()))?;
            BuiltOperator::Keysort(keysort::Keysort::new(key, value, args.window, args.common.table_size, 0))
        }
        Operator::Removenest(args) => {
            let path = args
                .common
                .labels
                .first()
                .ok_or_else(|| OpsError::MissingLabel("removenest requires a dotted label path".into()))?;
            let excluded = registry
                .parse_path(path)
                .map_err(|e| OpsError::InvalidOption(e.to_string()))?;
            BuiltOperator::Removenest(removenest::Removenest::new(excluded))
        }
    })
}
