use crate::Tuple;
use label::Label;
use record::{evahash64, HashRange, Value};
use std::sync::Arc;

/// What a `Record` carries: either a scalar leaf value, or a nested
/// tuple (a tuple is itself "a specialisation of record").
#[derive(Clone)]
pub enum Payload {
    Scalar(Value<'static>),
    Nested(Tuple),
}

/// A reference-counted value attached to zero or more labels. Members
/// are always held behind `Arc` (see the [`Member`] alias) so attaching
/// the same record to several tuples is a refcount bump, never a copy.
///
/// The teacher's `Datum` borrows its text/bytes payload for the
/// lifetime of an iterator pass; here every leaf is promoted to an
/// owned value at construction time instead, and the `dependency` link
/// exists purely to keep a donor record's `Arc` alive for as long as
/// this one needs it (deep-copy sharing), not for unsafe slice
/// borrowing across lifetimes - a deliberate scope reduction, see
/// `DESIGN.md`.
pub struct Record {
    pub payload: Payload,
    pub labels: Vec<Label>,
    pub dependency: Option<Arc<Record>>,
}

/// A tuple's entry: a refcounted, possibly multiply-attached `Record`.
pub type Member = Arc<Record>;

impl Record {
    pub fn scalar(value: Value<'static>, labels: Vec<Label>) -> Member {
        Arc::new(Record {
            payload: Payload::Scalar(value),
            labels,
            dependency: None,
        })
    }

    pub fn nested(tuple: Tuple, labels: Vec<Label>) -> Member {
        Arc::new(Record {
            payload: Payload::Nested(tuple),
            labels,
            dependency: None,
        })
    }

    pub fn with_dependency(mut self, dependency: Member) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    pub fn as_value(&self) -> Option<&Value<'static>> {
        match &self.payload {
            Payload::Scalar(v) => Some(v),
            Payload::Nested(_) => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match &self.payload {
            Payload::Nested(t) => Some(t),
            Payload::Scalar(_) => None,
        }
    }

    /// Mixes this member's identity bytes into `acc`. Scalars use their
    /// `HashRange` bytes directly; a nested tuple folds in an unordered
    /// hash of its own members, so two structurally-equal nested tuples
    /// hash identically regardless of attachment order.
    pub fn mix_hash(&self, seed: u64, acc: &mut u64) {
        match &self.payload {
            Payload::Scalar(v) => v.mix_hash(seed, acc),
            Payload::Nested(t) => {
                let nested = t.hash_all(seed);
                *acc = evahash64(&nested.to_le_bytes(), *acc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use label::Registry;

    #[test]
    fn test_scalar_member_roundtrip() {
        let registry = Registry::new();
        let lbl = registry.register_indexed("FOO");
        let member = Record::scalar(Value::from("bar"), vec![lbl.clone()]);
        assert!(member.has_label(&lbl));
        assert_eq!(member.as_value().and_then(|v| v.as_str()), Some("bar"));
    }
}
