//! Bounded, LRU-evicting keyed state storage.

mod shared;
mod table;
mod walker;

pub use shared::SharedTables;
pub use table::{SlotGuard, StateTable};
pub use walker::Walker;
