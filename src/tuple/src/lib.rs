//! Growable, label-indexed tuple containers.

mod body;
mod capacity;
mod entry;
mod error;
mod pool;
mod tuple;

pub use capacity::{CapacityClass, MAX_LEN};
pub use entry::{Member, Payload, Record};
pub use error::TupleError;
pub use pool::{Stats, TuplePool};
pub use tuple::Tuple;
