//! The error type shared across collaborator boundaries.
//!
//! Every capability the observer consumes (anchor graph, protocol provider,
//! DID-anchor index, outbox, broker) reports failures as an [`OrbError`].
//! The only property the pub/sub bridge inspects is [`OrbError::is_transient`]:
//! transient failures are negatively acknowledged and redelivered, everything
//! else is acknowledged and dropped.

/// Classified failure reported by a node component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrbError {
    /// The operation may succeed if retried (store unavailable, iterator
    /// failure, batch write failure, network error).
    #[error("transient: {0}")]
    Transient(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The input is malformed or unsupported and will never succeed.
    #[error("invalid: {0}")]
    Invalid(String),

    /// Any other permanent failure.
    #[error("{0}")]
    Other(String),
}

impl OrbError {
    /// Returns `true` if the failure should be retried via redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns `true` if the failure reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Prefixes the message with `context`, keeping the classification.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Transient(m) => Self::Transient(format!("{context}: {m}")),
            Self::NotFound(m) => Self::NotFound(format!("{context}: {m}")),
            Self::Invalid(m) => Self::Invalid(format!("{context}: {m}")),
            Self::Other(m) => Self::Other(format!("{context}: {m}")),
        }
    }

    /// Shorthand for a transient error built from any displayable cause.
    pub fn transient(cause: impl std::fmt::Display) -> Self {
        Self::Transient(cause.to_string())
    }

    /// Shorthand for a permanent validation error.
    pub fn invalid(cause: impl std::fmt::Display) -> Self {
        Self::Invalid(cause.to_string())
    }
}
