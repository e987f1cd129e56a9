//! Resolution backed by the DID-anchor index, with discovery routed to the
//! observer's DID topic.

use std::sync::Arc;

use async_trait::async_trait;
use orb_observer::Publisher;
use orb_resolver::{Discovery, DocumentResolver, ResolutionResult};
use orb_store::{DidAnchorStore, StoreError};
use orb_types::{OrbError, DID_DELIMITER};
use serde_json::json;

const RESOLUTION_CONTEXT: &str = "https://w3id.org/did-resolution/v1";

/// Resolves a DID to the anchor that last updated it.
pub struct IndexResolver {
    index: DidAnchorStore,
}

impl IndexResolver {
    pub fn new(index: DidAnchorStore) -> Self {
        Self { index }
    }
}

#[async_trait]
impl DocumentResolver for IndexResolver {
    async fn resolve_document(&self, id: &str) -> Result<ResolutionResult, OrbError> {
        let suffix = id
            .rsplit_once(DID_DELIMITER)
            .map(|(_, suffix)| suffix.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OrbError::Invalid(format!("invalid DID [{id}]")))?;

        let index = self.index.clone();
        let lookup = suffix.clone();
        let anchor = tokio::task::spawn_blocking(move || index.get(&lookup))
            .await
            .map_err(|e| OrbError::Transient(format!("index lookup task failed: {e}")))?;

        let anchor = match anchor {
            Ok(anchor) => anchor,
            Err(StoreError::NotFound(_)) => {
                return Err(OrbError::NotFound(format!("DID [{id}] not found")));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ResolutionResult {
            context: RESOLUTION_CONTEXT.to_string(),
            did_document: json!({ "id": id }),
            did_document_metadata: json!({
                "method": {
                    "published": true,
                    "anchorOrigin": anchor,
                },
                "canonicalId": id,
                "suffix": suffix,
            }),
        })
    }
}

/// Requests discovery by queueing the DID for out-of-system processing.
pub struct PublisherDiscovery {
    publisher: Arc<dyn Publisher>,
}

impl PublisherDiscovery {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Discovery for PublisherDiscovery {
    async fn request_discovery(&self, orb_suffix: &str) -> Result<(), OrbError> {
        self.publisher.publish_did(orb_suffix).await
    }
}
