use label::Label;
use std::sync::Arc;
use tuple::{Member, Tuple, TuplePool};

/// Pulls a wall-clock-seconds timestamp out of `tuple`'s first member
/// under `time_label` (a `Timestamp`, or a raw `Int`/`Double` epoch
/// value), falling back to the current time when the label is absent
/// or `time_label` is `None` - the "wall-clock or tuple timestamp"
/// choice every rate/period/persistence operator is built on.
pub fn event_seconds(tuple: &Tuple, time_label: Option<&Label>) -> f64 {
    if let Some(label) = time_label {
        if let Some(member) = tuple.find(label).into_iter().next() {
            if let Some(value) = member.as_value() {
                if let Some((sec, usec)) = value.as_timestamp() {
                    return sec as f64 + usec as f64 / 1_000_000.0;
                }
                if let Some(d) = value.as_double() {
                    return d;
                }
            }
        }
    }
    let now = record::timestamp_now();
    match now.as_timestamp() {
        Some((sec, usec)) => sec as f64 + usec as f64 / 1_000_000.0,
        None => 0.0,
    }
}

/// Appends `member` to `input`, mutating in place when the tuple is
/// growable and falling back to a deep copy first when it isn't (the
/// "borrowed-pointer" case - see `tuple::Tuple::from_members`). Every
/// operator that emits by adding a member to its input goes through
/// this, mirroring how the original descriptors either mutate the live
/// tuple or must clone first depending on ownership.
pub fn emit_member(input: &Tuple, pool: &Arc<TuplePool>, member: Member) -> Tuple {
    if input.can_grow() {
        let _ = input.add_member(member, &pool.stats);
        input.clone()
    } else {
        let copy = input.deep_copy(pool);
        let _ = copy.add_member(member, &pool.stats);
        copy
    }
}
