//! Scalar value primitives shared by every layer above this one.

mod hash;
mod value;

pub use hash::{evahash64, HashRange};
pub use value::Value;

/// Builds a `Value::Timestamp` from a `chrono` UTC time, the conversion
/// point between wall-clock time and the `(sec, usec)` pair tuples carry
/// internally.
pub fn timestamp_now() -> Value<'static> {
    let now = chrono::Utc::now();
    Value::Timestamp {
        sec: now.timestamp(),
        usec: now.timestamp_subsec_micros() as i32,
    }
}
