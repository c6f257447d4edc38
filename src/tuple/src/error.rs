use std::fmt;

/// Grounded on `storage::error::StorageError`'s single-variant,
/// `From`-wrapping style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleError {
    /// Growth was attempted on a tuple built with `can_grow = false`
    /// (the borrowed-pointer case - a read-only slice handed to an
    /// operator that must not mutate its input).
    NotGrowable,
    /// The tuple already sits at `MAX_LEN` members.
    Overflow,
}

impl fmt::Display for TupleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleError::NotGrowable => write!(f, "tuple is not growable"),
            TupleError::Overflow => write!(f, "tuple exceeds maximum length"),
        }
    }
}

impl std::error::Error for TupleError {}
