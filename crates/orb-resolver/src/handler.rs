use std::sync::Arc;

use async_trait::async_trait;
use orb_types::{OrbError, DID_DELIMITER};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Minimum `:`-separated parts of an Orb suffix: CAS hint and unique suffix.
const MIN_ORB_SUFFIX_PARTS: usize = 2;

/// A resolved DID document and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    #[serde(rename = "@context")]
    pub context: String,
    pub did_document: serde_json::Value,
    pub did_document_metadata: serde_json::Value,
}

/// Resolves DIDs known to this node.
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    /// Returns [`OrbError::NotFound`] when the DID is unknown.
    async fn resolve_document(&self, id: &str) -> Result<ResolutionResult, OrbError>;
}

/// Requests that peers be searched for a DID.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn request_discovery(&self, orb_suffix: &str) -> Result<(), OrbError>;
}

/// Document resolver that triggers discovery for unknown DIDs.
pub struct ResolveHandler {
    namespace: String,
    aliases: Vec<String>,
    unpublished_did_label: String,
    resolver: Arc<dyn DocumentResolver>,
    discovery: Arc<dyn Discovery>,
}

impl ResolveHandler {
    pub fn new(
        namespace: impl Into<String>,
        aliases: Vec<String>,
        unpublished_did_label: impl Into<String>,
        resolver: Arc<dyn DocumentResolver>,
        discovery: Arc<dyn Discovery>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            aliases,
            unpublished_did_label: unpublished_did_label.into(),
            resolver,
            discovery,
        }
    }

    /// Resolves `id`, requesting discovery when it is not found. The
    /// resolver's error is returned unchanged.
    pub async fn resolve_document(&self, id: &str) -> Result<ResolutionResult, OrbError> {
        match self.resolver.resolve_document(id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.is_not_found() {
                    self.request_discovery(id).await;
                }
                Err(e)
            }
        }
    }

    async fn request_discovery(&self, id: &str) {
        let orb_suffix = match self.orb_suffix(id) {
            Ok(suffix) => suffix,
            Err(e) => {
                tracing::debug!(id, error = %e, "no orb suffix, skipping discovery");
                return;
            }
        };

        if orb_suffix.starts_with(&self.unpublished_did_label) {
            return;
        }

        tracing::info!(orb_suffix, "requesting discovery");

        if let Err(e) = self.discovery.request_discovery(orb_suffix).await {
            tracing::warn!(orb_suffix, error = %e, "discovery request failed");
        }
    }

    fn namespace_of(&self, did: &str) -> Result<&str, ResolveError> {
        std::iter::once(&self.namespace)
            .chain(self.aliases.iter())
            .find(|ns| {
                did.strip_prefix(ns.as_str())
                    .is_some_and(|rest| rest.starts_with(DID_DELIMITER))
            })
            .map(String::as_str)
            .ok_or_else(|| ResolveError::UnknownNamespace {
                namespace: self.namespace.clone(),
                aliases: self.aliases.clone(),
            })
    }

    /// Returns the part of `did` after its namespace, which must hold a CAS
    /// hint and a suffix.
    pub fn orb_suffix<'a>(&self, did: &'a str) -> Result<&'a str, ResolveError> {
        let namespace = self.namespace_of(did)?;
        let suffix = &did[namespace.len() + 1..];

        if suffix.split(DID_DELIMITER).count() < MIN_ORB_SUFFIX_PARTS {
            return Err(ResolveError::InvalidSuffix(suffix.to_string()));
        }

        Ok(suffix)
    }
}
