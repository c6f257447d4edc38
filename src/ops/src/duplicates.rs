use crate::common::emit_member;
use label::Label;
use record::Value;
use std::sync::{Arc, Mutex};
use tuple::{Record, Tuple, TuplePool};

/// `m = 16384` bits, `k = 4` hash functions per generation - the
/// concrete Bloom filter sizing spec.md's open question on probabilistic
/// set parameters asks an implementer to pick (≈1% false-positive rate
/// at ~1000 members tracked per generation).
const BLOOM_BITS: usize = 16384;
const BLOOM_WORDS: usize = BLOOM_BITS / 64;
const BLOOM_K: usize = 4;

struct Generation {
    bits: Vec<u64>,
    salt: u64,
    seen: u64,
}

impl Generation {
    fn fresh(salt: u64) -> Self {
        Generation {
            bits: vec![0u64; BLOOM_WORDS],
            salt,
            seen: 0,
        }
    }

    fn positions(&self, combined_hash: u64) -> [usize; BLOOM_K] {
        let mut positions = [0usize; BLOOM_K];
        let mut acc = combined_hash ^ self.salt;
        for slot in positions.iter_mut() {
            acc = record::evahash64(&acc.to_le_bytes(), self.salt);
            *slot = (acc as usize) % BLOOM_BITS;
        }
        positions
    }

    fn test_and_set(&mut self, combined_hash: u64) -> bool {
        let positions = self.positions(combined_hash);
        let already_present = positions
            .iter()
            .all(|p| self.bits[p / 64] & (1 << (p % 64)) != 0);
        for p in &positions {
            self.bits[p / 64] |= 1 << (p % 64);
        }
        already_present
    }
}

/// Tags whole events (the set of members matching `target_label` within
/// one input tuple) as `DUPLICATE` or `UNIQUE` based on an XOR-mixed
/// combined hash of those members, tracked in a rotating Bloom filter.
/// Rotation (a fresh filter + salt every `rotate_after` events) bounds
/// the false-positive rate on a long-lived stream - a scope decision
/// beyond what spec.md's distillation fixes, recorded in `DESIGN.md`.
pub struct Duplicates {
    target_label: Label,
    dup_label: Label,
    unique_label: Option<Label>,
    rotate_after: u64,
    generation: Mutex<Generation>,
}

impl Duplicates {
    pub fn new(
        target_label: Label,
        dup_label: Label,
        unique_label: Option<Label>,
        rotate_after: u64,
    ) -> Self {
        Duplicates {
            target_label,
            dup_label,
            unique_label,
            rotate_after: rotate_after.max(1),
            generation: Mutex::new(Generation::fresh(0)),
        }
    }

    pub fn process(&self, input: &Tuple, pool: &Arc<TuplePool>) -> Tuple {
        let members = input.find(&self.target_label);
        if members.is_empty() {
            return input.clone();
        }
        let mut combined: u64 = 0;
        for member in &members {
            let mut h = 0u64;
            member.mix_hash(0, &mut h);
            combined ^= h;
        }

        let is_duplicate = {
            let mut gen = self.generation.lock().unwrap();
            gen.seen += 1;
            if gen.seen > self.rotate_after {
                *gen = Generation::fresh(gen.salt.wrapping_add(1));
            }
            gen.test_and_set(combined)
        };

        let tag_label = if is_duplicate {
            Some(self.dup_label.clone())
        } else {
            self.unique_label.clone()
        };
        let tag_label = match tag_label {
            Some(l) => l,
            None => return input.clone(),
        };

        let mut out = input.clone();
        for member in members {
            if let Some(value) = member.as_value() {
                let tagged = Record::scalar(value.as_static(), vec![tag_label.clone()]);
                out = emit_member(&out, pool, tagged);
            }
        }
        out
    }
}
