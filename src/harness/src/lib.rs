//! Dispatch loop binding a keyed operator descriptor to a state table.

mod descriptor;
mod harness;
mod port;

pub use descriptor::OperatorDescriptor;
pub use harness::{Harness, HarnessOutcome};
pub use port::Port;
