use std::fmt;

/// Configuration errors raised at operator construction - missing
/// labels, out-of-range options. Per spec.md's error taxonomy these are
/// the one class that fails startup rather than being dropped/skipped
/// at the per-record level.
#[derive(Debug, Clone, PartialEq)]
pub enum OpsError {
    InvalidOption(String),
    MissingLabel(String),
}

impl fmt::Display for OpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpsError::InvalidOption(msg) => write!(f, "invalid option: {}", msg),
            OpsError::MissingLabel(name) => write!(f, "missing required label: {}", name),
        }
    }
}

impl std::error::Error for OpsError {}
