use common::StorageError;

/// Errors surfaced by the stats store.
///
/// A point-lookup miss is not represented here: read APIs return
/// `Option::None` for an absent bucket, so an empty time range is never
/// mistaken for a failure. Duplicate submissions are likewise a successful
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The underlying storage engine failed on a get, put, or scan.
    Storage(String),
    /// A stored record could not be encoded or decoded.
    Encoding(String),
    /// Input was rejected before any I/O, e.g. an unrecognized timestamp.
    InvalidInput(String),
    /// A fault in the store itself, e.g. a stopped ingestion worker.
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "storage error: {}", msg),
            Error::Encoding(msg) => write!(f, "encoding error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

/// Result type for stats store operations.
pub type Result<T> = std::result::Result<T, Error>;
