use crate::common::emit_member;
use crate::error::OpsError;
use label::Label;
use record::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tuple::{Record, Tuple, TuplePool};

/// Counts bytes within a caller-specified set in a buffer, emitting the
/// count as a new `CHARCNT`-labelled member. Stateless per record -
/// grounded directly on `original_source/src/procs/proc_charcnt.c`'s
/// single-pass byte scan, no keyed-operator harness involved.
pub struct Charcnt {
    dict: HashSet<u8>,
    target_label: Label,
    out_label: Label,
}

impl Charcnt {
    /// `hex_dict` is a hex-encoded byte string (e.g. `"3d"` for `=`),
    /// matching the CLI's hex-dictionary option.
    pub fn new(hex_dict: &str, target_label: Label, out_label: Label) -> Result<Self, OpsError> {
        if hex_dict.len() % 2 != 0 {
            return Err(OpsError::InvalidOption("charcnt dictionary must have an even number of hex digits".into()));
        }
        let mut dict = HashSet::new();
        let bytes = hex_dict.as_bytes();
        for chunk in bytes.chunks(2) {
            let s = std::str::from_utf8(chunk).map_err(|_| {
                OpsError::InvalidOption("charcnt dictionary must be ASCII hex".into())
            })?;
            let byte = u8::from_str_radix(s, 16)
                .map_err(|_| OpsError::InvalidOption("charcnt dictionary must be valid hex".into()))?;
            dict.insert(byte);
        }
        Ok(Charcnt {
            dict,
            target_label,
            out_label,
        })
    }

    pub fn process(&self, input: &Tuple, pool: &Arc<TuplePool>) -> Tuple {
        let mut count: i64 = 0;
        for member in input.find(&self.target_label) {
            if let Some(bytes) = member.as_value().and_then(|v| v.as_bytes()) {
                count += bytes.iter().filter(|b| self.dict.contains(b)).count() as i64;
            }
        }
        let out = Record::scalar(Value::from(count), vec![self.out_label.clone()]);
        emit_member(input, pool, out)
    }
}
