use thiserror::Error;

/// Reasons an identifier carries no discoverable Orb suffix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("did must start with configured namespace [{namespace}] or aliases {aliases:?}")]
    UnknownNamespace {
        namespace: String,
        aliases: Vec<String>,
    },

    #[error("invalid number of parts for orb suffix [{0}]")]
    InvalidSuffix(String),
}
