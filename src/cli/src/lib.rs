//! The operator-selection CLI surface: `clap`-derived argument structs
//! plus the glue that turns a parsed [`args::Operator`] into a running
//! [`build::BuiltOperator`]. The teacher's root crate declares `clap`
//! as a dependency but never wires it into an actual command surface;
//! here it drives the one thing this binary needs picked at startup -
//! which operator to run and with what labels.

mod args;
mod build;

pub use args::{Cli, Operator, DEFAULT_TABLE_SIZE};
pub use build::{build, BuiltOperator};
