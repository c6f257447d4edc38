//! The operator catalogue: one module per `ops::` keyed or stateless
//! transform, each grounded on a `proc_*.c` file from the original
//! engine and built either against `harness::OperatorDescriptor` or,
//! where that contract doesn't fit, directly against `state`/`tuple`.

mod common;
mod error;

pub mod charcnt;
pub mod countfilter;
pub mod duplicates;
pub mod groupevents;
pub mod keyadd;
pub mod keydiff;
pub mod keyewma;
pub mod keyrate;
pub mod keysort;
pub mod keytrans;
pub mod periodic;
pub mod persist;
pub mod removenest;
pub mod strlen;

pub use error::OpsError;
