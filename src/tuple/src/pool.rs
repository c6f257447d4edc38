use crate::body::TupleBody;
use crate::capacity::CapacityClass;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Process-wide counters for the non-fatal failure modes tuples can hit.
/// Grounded on the counter-over-log-line choice documented for
/// capacity-exhaustion style warnings.
#[derive(Default)]
pub struct Stats {
    pub index_overflow: AtomicU64,
    pub stale_discards: AtomicU64,
    pub huge_allocs: AtomicU64,
}

impl Stats {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.index_overflow.load(Ordering::Relaxed),
            self.stale_discards.load(Ordering::Relaxed),
            self.huge_allocs.load(Ordering::Relaxed),
        )
    }
}

/// One `Mutex<Vec<TupleBody>>` stack per pooled capacity class, exactly
/// the "lock guarding push/pop" discipline chosen over a lock-free stack
/// (see `DESIGN.md`). `Huge` bodies bypass the pool entirely.
pub struct TuplePool {
    small: Mutex<Vec<TupleBody>>,
    medium: Mutex<Vec<TupleBody>>,
    large: Mutex<Vec<TupleBody>>,
    pub stats: Stats,
}

impl Default for TuplePool {
    fn default() -> Self {
        TuplePool::new()
    }
}

impl TuplePool {
    pub fn new() -> Self {
        TuplePool {
            small: Mutex::new(Vec::new()),
            medium: Mutex::new(Vec::new()),
            large: Mutex::new(Vec::new()),
            stats: Stats::default(),
        }
    }

    fn list_for(&self, class: CapacityClass) -> Option<&Mutex<Vec<TupleBody>>> {
        match class {
            CapacityClass::Small => Some(&self.small),
            CapacityClass::Medium => Some(&self.medium),
            CapacityClass::Large => Some(&self.large),
            CapacityClass::Huge(_) => None,
        }
    }

    /// Pops a compatible body for `class`/`index_len`, discarding any
    /// bodies it finds allocated under a stale (now-smaller) index
    /// length before falling back to a fresh allocation.
    pub fn alloc(&self, class: CapacityClass, index_len: u32) -> TupleBody {
        if let Some(list) = self.list_for(class) {
            let mut guard = list.lock().unwrap();
            while let Some(body) = guard.pop() {
                if body.index_len == index_len {
                    return body;
                }
                self.stats.stale_discards.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.stats.huge_allocs.fetch_add(1, Ordering::Relaxed);
        }
        TupleBody::fresh(class, index_len)
    }

    /// Returns a body to its class's free list, clearing it first.
    /// Bodies that grew into `Huge` territory during their lifetime are
    /// simply dropped, matching HUGE's "plain-allocated" free-list
    /// back-pointer of NULL.
    pub fn release(&self, mut body: TupleBody) {
        let index_len = body.index_len;
        if let Some(list) = self.list_for(body.capacity) {
            body.reset(index_len);
            list.lock().unwrap().push(body);
        }
    }
}
