/// Ports the harness dispatches on, matching spec.md's port contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    /// Normal processing: run `update`/`update_value`/`update_value_index`.
    Data,
    /// Cooperative walking: advance the gradual-expiration cursor one step.
    Expire,
    /// Remove the tuple's key, invoking `expire` first.
    Delete,
    /// Synonym for `Delete` kept distinct so callers can log which verb
    /// triggered the removal.
    Remove,
    /// Drain every slot via `flush`.
    Flush,
}
