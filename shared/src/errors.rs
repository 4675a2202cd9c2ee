use thiserror::Error;

/// Store failures keep their cause tagged here; the worker flattens them to
/// a continue-or-terminate decision at its boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("node already exists: {0}")]
    AlreadyExists(String),
    #[error("version conflict on {0}")]
    VersionConflict(String),
    #[error("store connection lost")]
    Disconnected,
    #[error("store operation timed out")]
    Timeout,
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Absent nodes are an expected outcome in several places (double
    /// cleanup, shutdown signal); everything else is a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Malformed persisted values: problem descriptors, solution records,
/// worker assignments.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("malformed {what}: {value:?}")]
    Malformed { what: &'static str, value: String },
    #[error("bad hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("target must decode to {expected} bytes, got {actual}")]
    TargetWidth { expected: usize, actual: usize },
    #[error("bad number: {0}")]
    Number(#[from] std::num::ParseIntError),
}
