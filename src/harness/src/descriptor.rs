use tuple::{Member, Tuple};

/// What a keyed operator supplies to the harness.
///
/// Grounded on `functions::aggregate::AggregateFunction`, generalized
/// from a fixed scalar accumulator to an arbitrary per-key `Slot` type
/// and from a single `apply` call to the full lifecycle the original
/// `wsprockeystate_kid_t` descriptor exposes (init/update/expire/flush).
/// Every method but `update`/`update_value`/`update_value_index` has a
/// default no-op implementation, since most operators only need one or
/// two of them.
pub trait OperatorDescriptor {
    /// Per-key state. `Default::default()` is the slot's zeroed form,
    /// created on first touch by `StateTable::find_attach`.
    type Slot: Default + Send + Sync + 'static;

    fn init(&mut self) {}
    fn option(&mut self, _opt: &str) {}
    fn destroy(&mut self) {}

    /// Single-key, no-value mode: called once per matching key member.
    /// Returning `true` forwards the input tuple downstream.
    fn update(&mut self, _slot: &mut Self::Slot, _tuple: &Tuple, _key_hash: u64) -> bool {
        false
    }

    /// Single-value mode: called once per (key, value) pair.
    fn update_value(
        &mut self,
        _slot: &mut Self::Slot,
        _tuple: &Tuple,
        _key_hash: u64,
        _value: &Member,
    ) -> bool {
        false
    }

    /// Multi-value mode setup, called once before the `update_value_index`
    /// calls for this record with the number of values about to follow.
    fn init_mvalue(&mut self, _slot: &mut Self::Slot, _count: usize) {}

    /// Multi-value mode: called once per value, in attachment order,
    /// with `index` as its 0-based position.
    fn update_value_index(
        &mut self,
        _slot: &mut Self::Slot,
        _tuple: &Tuple,
        _key_hash: u64,
        _value: &Member,
        _index: usize,
    ) -> bool {
        false
    }

    /// Multi-value mode teardown, called once after every value for
    /// this record has gone through `update_value_index`.
    fn post_update_mvalue(&mut self, _slot: &mut Self::Slot, _tuple: &Tuple, _key_hash: u64) {}

    /// Per-event-driven eviction check, run after every update. When
    /// this returns `true` the harness immediately calls `expire` and
    /// deletes the slot.
    fn force_expire(&mut self, _slot: &Self::Slot, _tuple: &Tuple, _key_hash: u64) -> bool {
        false
    }

    /// Terminal emission: appends zero or more tuples to `out` before
    /// the slot is discarded.
    fn expire(&mut self, _slot: &Self::Slot, _key_hash: u64, _out: &mut Vec<Tuple>) {}

    /// Called once per slot when the harness is asked to drain the
    /// whole table (`Port::Flush`). Defaults to `expire`'s behavior.
    fn flush(&mut self, slot: &Self::Slot, key_hash: u64, out: &mut Vec<Tuple>) {
        self.expire(slot, key_hash, out)
    }

    /// When true, `Port::Expire` walks one slot per call instead of
    /// requiring an explicit key (cooperative, non-blocking expiration).
    fn gradual_expire(&self) -> bool {
        false
    }
}
