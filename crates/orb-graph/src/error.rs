//! Error types for anchor graph access.

use orb_types::OrbError;

/// Errors that can occur while reading the anchor graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The CAS could not be reached or the transfer failed.
    #[error("CAS request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The CAS has no content for the address.
    #[error("content not found in CAS: {0}")]
    NotFound(String),

    /// The CAS answered with an unexpected status.
    #[error("CAS returned status {status} for [{cid}]")]
    Status {
        status: reqwest::StatusCode,
        cid: String,
    },

    /// The CAS base URL cannot address the content.
    #[error("invalid CAS URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<GraphError> for OrbError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Network(_) => OrbError::Transient(err.to_string()),
            GraphError::Status { status, .. } if status.is_server_error() => {
                OrbError::Transient(err.to_string())
            }
            GraphError::NotFound(_) => OrbError::NotFound(err.to_string()),
            GraphError::Status { .. } => OrbError::Other(err.to_string()),
            GraphError::Url(_) => OrbError::Invalid(err.to_string()),
        }
    }
}
