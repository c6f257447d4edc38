use crate::body::TupleBody;
use crate::capacity::{CapacityClass, MAX_LEN};
use crate::error::TupleError;
use crate::pool::TuplePool;
use crate::entry::{Member, Payload, Record};
use label::{Label, NestedLabelSet};
use record::evahash64;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// A growable, reference-counted sequence of [`Member`]s plus a
/// per-label inverted index. Cloning a `Tuple` clones the handle (an
/// `Arc`), not the contents - every clone shares the same growable
/// storage, matching the teacher's refcounted-container style
/// (`Arc<DB>` in `Storage`) generalized from a table handle to a tuple
/// handle.
#[derive(Clone)]
pub struct Tuple {
    inner: Arc<Mutex<TupleBody>>,
    pool: Option<Arc<TuplePool>>,
    can_grow: bool,
}

impl Tuple {
    /// Allocates a growable tuple from `pool`, starting at `Small`
    /// capacity with `index_len` inverted-index buckets.
    pub fn new(pool: &Arc<TuplePool>, index_len: u32) -> Tuple {
        let body = pool.alloc(CapacityClass::Small, index_len);
        Tuple {
            inner: Arc::new(Mutex::new(body)),
            pool: Some(Arc::clone(pool)),
            can_grow: true,
        }
    }

    /// Builds a non-growable tuple directly from `members` - the
    /// "borrowed-pointer" case handed to operators that must not
    /// mutate their input. Not drawn from, or returned to, any pool.
    pub fn from_members(members: Vec<Member>, index_len: u32) -> Tuple {
        let mut body = TupleBody::fresh(CapacityClass::Huge(members.len().max(1)), index_len);
        for member in members {
            body.push_indexed(&member);
            body.members.push(member);
        }
        Tuple {
            inner: Arc::new(Mutex::new(body)),
            pool: None,
            can_grow: false,
        }
    }

    pub fn can_grow(&self) -> bool {
        self.can_grow
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn capacity(&self) -> CapacityClass {
        self.inner.lock().unwrap().capacity
    }

    /// Appends `member`, growing the backing body (promoting its
    /// capacity class) as needed and updating the inverted index for
    /// every indexed label the member carries.
    pub fn add_member(&self, member: Member, stats: &crate::pool::Stats) -> Result<(), TupleError> {
        if !self.can_grow {
            return Err(TupleError::NotGrowable);
        }
        let mut body = self.inner.lock().unwrap();
        while body.members.len() >= body.capacity.max() {
            if body.capacity.max() >= MAX_LEN {
                return Err(TupleError::Overflow);
            }
            body.capacity = body.capacity.grow()?;
        }
        body.push_indexed_counted(&member, stats);
        body.members.push(member);
        Ok(())
    }

    /// O(bucket-length) lookup by label; returns a fresh `Vec` of
    /// cloned `Arc` handles rather than a borrowed slice, since the
    /// body lives behind a `Mutex` - see `DESIGN.md`.
    pub fn find(&self, label: &Label) -> Vec<Member> {
        if !label.is_indexed() {
            return Vec::new();
        }
        let body = self.inner.lock().unwrap();
        let idx = (label.index_id() - 1) as usize;
        body.index.get(idx).cloned().unwrap_or_default()
    }

    pub fn members(&self) -> Vec<Member> {
        self.inner.lock().unwrap().members.clone()
    }

    /// Walks a tree of label sets: entries with a non-zero nesting id
    /// recurse into matching members that are themselves tuples;
    /// zero-nesting-id entries invoke `cb` directly. Returns the number
    /// of `cb` invocations.
    pub fn nested_search(&self, set: &NestedLabelSet, cb: &mut dyn FnMut(&Member)) -> usize {
        let mut count = 0;
        for entry in &set.entries {
            for member in self.find(&entry.label) {
                if entry.nesting_id == 0 {
                    cb(&member);
                    count += 1;
                } else if let Some(child) = set.child(entry.nesting_id) {
                    if let Payload::Nested(nested) = &member.payload {
                        count += nested.nested_search(child, cb);
                    }
                }
            }
        }
        count
    }

    /// Hashes every member matching a label in `labels` into `seed`.
    /// When `ordered` is true, each label's position in `labels`
    /// contributes to the hash, so permuting the label set changes the
    /// result even if the same members match.
    pub fn hash_tuple(&self, labels: &[Label], seed: u64, ordered: bool) -> u64 {
        let mut acc = seed;
        for (pos, label) in labels.iter().enumerate() {
            for member in self.find(label) {
                if ordered {
                    acc = evahash64(&(pos as u64).to_le_bytes(), acc);
                }
                member.mix_hash(seed, &mut acc);
            }
        }
        acc
    }

    /// Unordered hash over every member, used when a nested tuple
    /// itself needs a single identity hash (see `Record::mix_hash`).
    pub fn hash_all(&self, seed: u64) -> u64 {
        let mut acc = seed;
        for member in self.inner.lock().unwrap().members.iter() {
            member.mix_hash(seed, &mut acc);
        }
        acc
    }

    /// Recursive deep copy: labels are duplicated, scalar leaves are
    /// shared by `Arc::clone`, nested tuples are recursively copied.
    pub fn deep_copy(&self, pool: &Arc<TuplePool>) -> Tuple {
        self.deep_copy_filtered(pool, &HashSet::new())
    }

    /// As [`Tuple::deep_copy`], but members whose pointer identity is in
    /// `exclude` are skipped - grounds `ops::removenest`.
    pub fn deep_copy_filtered(&self, pool: &Arc<TuplePool>, exclude: &HashSet<usize>) -> Tuple {
        let body = self.inner.lock().unwrap();
        let copy = Tuple::new(pool, body.index_len);
        for member in body.members.iter() {
            let ptr = Arc::as_ptr(member) as usize;
            if exclude.contains(&ptr) {
                continue;
            }
            let copied: Member = match &member.payload {
                Payload::Scalar(v) => Arc::new(Record {
                    payload: Payload::Scalar(v.clone()),
                    labels: member.labels.clone(),
                    dependency: None,
                }),
                Payload::Nested(nested) => Arc::new(Record {
                    payload: Payload::Nested(nested.deep_copy_filtered(pool, exclude)),
                    labels: member.labels.clone(),
                    dependency: None,
                }),
            };
            let _ = copy.add_member(copied, &pool.stats);
        }
        copy
    }
}

impl TupleBody {
    fn push_indexed(&mut self, member: &Member) {
        let max = self.capacity.max();
        for label in &member.labels {
            if label.is_indexed() {
                let idx = (label.index_id() - 1) as usize;
                if let Some(bucket) = self.index.get_mut(idx) {
                    if bucket.len() < max {
                        bucket.push(Arc::clone(member));
                    }
                }
            }
        }
    }

    fn push_indexed_counted(&mut self, member: &Member, stats: &crate::pool::Stats) {
        let max = self.capacity.max();
        for label in &member.labels {
            if label.is_indexed() {
                let idx = (label.index_id() - 1) as usize;
                if let Some(bucket) = self.index.get_mut(idx) {
                    if bucket.len() < max {
                        bucket.push(Arc::clone(member));
                    } else {
                        stats.index_overflow.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }
}

impl Drop for Tuple {
    fn drop(&mut self) {
        if let Some(pool) = &self.pool {
            if Arc::strong_count(&self.inner) == 1 {
                if let Ok(mut guard) = self.inner.lock() {
                    let body = std::mem::replace(&mut *guard, TupleBody::empty());
                    pool.release(body);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Record;
    use label::Registry;
    use record::Value;

    #[test]
    fn test_add_member_and_find() {
        let registry = Registry::new();
        let lbl = registry.register_indexed("A");
        let pool = Arc::new(TuplePool::new());
        let t = Tuple::new(&pool, registry.index_len());
        t.add_member(Record::scalar(Value::from(1i64), vec![lbl.clone()]), &pool.stats)
            .unwrap();
        t.add_member(Record::scalar(Value::from(2i64), vec![lbl.clone()]), &pool.stats)
            .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.find(&lbl).len(), 2);
    }

    #[test]
    fn test_grows_past_small_capacity() {
        let registry = Registry::new();
        let lbl = registry.register_indexed("A");
        let pool = Arc::new(TuplePool::new());
        let t = Tuple::new(&pool, registry.index_len());
        for i in 0..50 {
            t.add_member(Record::scalar(Value::from(i as i64), vec![lbl.clone()]), &pool.stats)
                .unwrap();
        }
        assert_eq!(t.len(), 50);
        assert_eq!(t.capacity(), CapacityClass::Medium);
    }

    #[test]
    fn test_not_growable_rejects_add() {
        let t = Tuple::from_members(Vec::new(), 0);
        let stats = crate::pool::Stats::default();
        let err = t
            .add_member(Record::scalar(Value::Null, vec![]), &stats)
            .unwrap_err();
        assert_eq!(err, TupleError::NotGrowable);
    }

    #[test]
    fn test_deep_copy_preserves_labels_and_values() {
        let registry = Registry::new();
        let lbl = registry.register_indexed("A");
        let pool = Arc::new(TuplePool::new());
        let t = Tuple::new(&pool, registry.index_len());
        t.add_member(Record::scalar(Value::from("x"), vec![lbl.clone()]), &pool.stats)
            .unwrap();
        let copy = t.deep_copy(&pool);
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.find(&lbl)[0].as_value().unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_nested_search_recurses() {
        let registry = Registry::new();
        let outer_lbl = registry.register_indexed("OUTER");
        let inner_lbl = registry.register_indexed("INNER");
        let pool = Arc::new(TuplePool::new());

        let inner = Tuple::new(&pool, registry.index_len());
        inner
            .add_member(Record::scalar(Value::from(42i64), vec![inner_lbl.clone()]), &pool.stats)
            .unwrap();

        let outer = Tuple::new(&pool, registry.index_len());
        outer
            .add_member(Record::nested(inner, vec![outer_lbl.clone()]), &pool.stats)
            .unwrap();

        let set = registry.parse_path("OUTER.INNER").unwrap();
        let mut seen = Vec::new();
        let count = outer.nested_search(&set, &mut |m| {
            seen.push(m.as_value().unwrap().as_int().unwrap())
        });
        assert_eq!(count, 1);
        assert_eq!(seen, vec![42]);
    }
}
