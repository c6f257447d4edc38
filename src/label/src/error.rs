use std::fmt;

/// Grounded on `planner::error::PlannerError`'s hand-rolled enum + manual
/// `Display` style.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LabelError {
    InvalidPath(String),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::InvalidPath(path) => write!(f, "invalid label path \"{}\"", path),
        }
    }
}

impl std::error::Error for LabelError {}
