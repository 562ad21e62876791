use thiserror::Error;

/// Errors returned by index queries.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The entry does not exist or is trashed.
    #[error("entry not found")]
    NotFound,

    /// Error from the underlying SQLite store.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl IndexError {
    /// Whether this error means the entry is absent rather than the store failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound)
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
