//! Errors of the label operations.

/// Why a label operation failed.
#[derive(thiserror::Error, Debug)]
pub enum FdiskError {
    /// A malformed value or an index out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No free range can satisfy the request.
    #[error("no free sectors available: {0}")]
    NoSpace(String),
    /// The change would break the layout of the table.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The on-disk data cannot be used.
    #[error("corrupt partition table: {0}")]
    Corrupt(String),
    /// Reading or writing the disk failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
    /// A question was not answered.
    #[error("cancelled")]
    Cancelled,
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T, E = FdiskError> = core::result::Result<T, E>;

/// Shorthand for building an error variant from format arguments.
#[macro_export]
macro_rules! fail {
    ($kind: ident, $($arg: tt)*) => { $crate::FdiskError::$kind(format!($($arg)*)) }
}
