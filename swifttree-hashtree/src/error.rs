use thiserror::Error;

/// Alias for `core::result::Result<T, HashTreeError>`.
pub type Result<T> = core::result::Result<T, HashTreeError>;

/// Environmental failures from hash tree operations.
///
/// Protocol-level rejections (hash mismatch, out-of-extent bin, bad peak
/// order) are not errors: fallible offers return `Ok(false)` and leave
/// trusted state untouched. An `Err` means the backing storage failed and
/// the tree has reset its size counters to zero.
#[derive(Debug, Error)]
pub enum HashTreeError {
    /// An I/O failure from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing store could not complete a read, write, or resize.
    #[error("store error: {0}")]
    Store(String),
    /// Invalid input parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
