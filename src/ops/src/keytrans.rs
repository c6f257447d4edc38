use crate::common::event_seconds;
use harness::{Harness, OperatorDescriptor};
use label::Label;
use record::{HashRange, Value};
use std::sync::Arc;
use tuple::{Member, Record, Tuple, TuplePool};

#[derive(Default)]
pub struct KeytransSlot {
    last_hash: Option<u64>,
    last_seconds: Option<f64>,
}

/// Per-key time-since-last-transition. With a value label configured,
/// state is the hash of the chosen member plus the last event time;
/// on a hash change, emit the elapsed time since the previous
/// transition. Without one, emit the gap between every consecutive
/// pair of events for the key. Grounded on
/// `original_source/src/procs/proc_keytrans.c`.
pub struct Keytrans {
    time_label: Option<Label>,
    out_label: Label,
    pool: Arc<TuplePool>,
}

impl Keytrans {
    pub fn new(time_label: Option<Label>, out_label: Label, pool: Arc<TuplePool>) -> Self {
        Keytrans {
            time_label,
            out_label,
            pool,
        }
    }

    fn emit_elapsed(&self, tuple: &Tuple, elapsed: f64) {
        let _ = tuple.add_member(
            Record::scalar(Value::from(elapsed), vec![self.out_label.clone()]),
            &self.pool.stats,
        );
    }
}

impl OperatorDescriptor for Keytrans {
    type Slot = KeytransSlot;

    fn update(&mut self, slot: &mut KeytransSlot, tuple: &Tuple, _key_hash: u64) -> bool {
        let now = event_seconds(tuple, self.time_label.as_ref());
        let forward = if let Some(last) = slot.last_seconds {
            self.emit_elapsed(tuple, now - last);
            true
        } else {
            false
        };
        slot.last_seconds = Some(now);
        forward
    }

    fn update_value(
        &mut self,
        slot: &mut KeytransSlot,
        tuple: &Tuple,
        _key_hash: u64,
        value: &Member,
    ) -> bool {
        let now = event_seconds(tuple, self.time_label.as_ref());
        let mut hash = 0u64;
        if let Some(v) = value.as_value() {
            v.mix_hash(0, &mut hash);
        }

        let forward = match (slot.last_hash, slot.last_seconds) {
            (Some(prev), Some(last)) if prev != hash => {
                self.emit_elapsed(tuple, now - last);
                true
            }
            _ => false,
        };
        slot.last_hash = Some(hash);
        slot.last_seconds = Some(now);
        forward
    }
}

pub type KeytransOp = Harness<Keytrans>;
