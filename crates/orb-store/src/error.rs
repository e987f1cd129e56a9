//! Error types for the node's stores.

use orb_types::OrbError;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation was submitted without a unique suffix.
    #[error("unique suffix is empty")]
    EmptySuffix,

    /// A pending operation already exists for the suffix.
    #[error(
        "pending operation found for suffix[{0}], please re-submit your operation request at later time"
    )]
    PendingOperation(String),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// No connection could be obtained from the pool.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] r2d2::Error),

    /// A write or scan failed in a way that a retry may fix.
    #[error("{context}: {source}")]
    Retryable {
        /// What the store was doing.
        context: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn retryable(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Retryable {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if the caller should retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Retryable { .. })
    }
}

impl From<StoreError> for OrbError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptySuffix | StoreError::PendingOperation(_) => {
                OrbError::Invalid(err.to_string())
            }
            StoreError::NotFound(_) => OrbError::NotFound(err.to_string()),
            e if e.is_transient() => OrbError::Transient(e.to_string()),
            e => OrbError::Other(e.to_string()),
        }
    }
}
