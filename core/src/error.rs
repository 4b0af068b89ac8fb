use thiserror::Error;

/// Errors produced by the storage layer.
///
/// The first four variants carry a user-facing message and map cleanly onto
/// HTTP statuses at the API boundary (400/409/404/400); `Storage` is anything
/// unexpected out of SQLite itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required input field was missing or empty.
    #[error("{0}")]
    Validation(String),
    /// A uniqueness violation, or a delete blocked by a usage guard.
    #[error("{0}")]
    Conflict(String),
    /// A referenced id does not exist.
    #[error("{0}")]
    NotFound(String),
    /// An unparseable time or date string.
    #[error("{0}")]
    Malformed(String),
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
