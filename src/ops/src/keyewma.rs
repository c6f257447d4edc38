use harness::{Harness, OperatorDescriptor};
use label::Label;
use record::Value;
use std::sync::Arc;
use tuple::{Member, Record, Tuple, TuplePool};

/// Default smoothing factor, matching `proc_keyewma.c`'s `-a` default.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Default)]
pub struct KeyewmaSlot {
    initialized: bool,
    mean: f64,
    variance: f64,
}

/// Per-key exponentially weighted moving mean and variance, attached
/// back onto the triggering tuple as `MEAN`/`VARIANCE` members.
///
/// Grounded on `original_source/src/procs/proc_keyewma.c`: on the first
/// observation the mean is seeded directly and variance stays zero; on
/// every later observation both are updated by the textbook EWMA
/// recurrence `delta = x - mean; mean += alpha * delta; variance =
/// (1 - alpha) * (variance + alpha * delta^2)`. The input tuple is
/// mutated directly (it is always the harness's own growable `Tuple`),
/// the same in-place-attach approach `ops::strlen` takes through
/// `common::emit_member`, just done inline since a harness descriptor
/// already holds `&Tuple`.
pub struct Keyewma {
    alpha: f64,
    mean_label: Label,
    variance_label: Label,
    pool: Arc<TuplePool>,
}

impl Keyewma {
    pub fn new(alpha: f64, mean_label: Label, variance_label: Label, pool: Arc<TuplePool>) -> Self {
        Keyewma {
            alpha,
            mean_label,
            variance_label,
            pool,
        }
    }
}

impl OperatorDescriptor for Keyewma {
    type Slot = KeyewmaSlot;

    fn update_value(
        &mut self,
        slot: &mut KeyewmaSlot,
        tuple: &Tuple,
        _key_hash: u64,
        value: &Member,
    ) -> bool {
        let x = match value.as_value().and_then(|v| v.as_double()) {
            Some(x) => x,
            None => return false,
        };
        if !slot.initialized {
            slot.mean = x;
            slot.variance = 0.0;
            slot.initialized = true;
        } else {
            let delta = x - slot.mean;
            slot.mean += self.alpha * delta;
            slot.variance = (1.0 - self.alpha) * (slot.variance + self.alpha * delta * delta);
        }

        let _ = tuple.add_member(
            Record::scalar(Value::from(slot.mean), vec![self.mean_label.clone()]),
            &self.pool.stats,
        );
        let _ = tuple.add_member(
            Record::scalar(Value::from(slot.variance), vec![self.variance_label.clone()]),
            &self.pool.stats,
        );
        true
    }
}

pub type KeyewmaOp = Harness<Keyewma>;
