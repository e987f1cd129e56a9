//! Anchor graph backed by a CAS reader.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use orb_types::{hashlink, AnchorCredential, OrbError, DID_DELIMITER};

use crate::cas::CasReader;

/// An anchor credential together with the hashlink it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub cid: String,
    pub info: AnchorCredential,
}

/// Read access to anchors.
#[async_trait]
pub trait AnchorGraph: Send + Sync {
    /// Returns the anchor credential addressed by `hashlink`.
    async fn read(&self, hashlink: &str) -> Result<AnchorCredential, OrbError>;

    /// Returns every anchor that references `suffix`, oldest first, starting
    /// from the anchor addressed by `cid` (hints allowed).
    async fn get_did_anchors(&self, cid: &str, suffix: &str) -> Result<Vec<Anchor>, OrbError>;
}

/// [`AnchorGraph`] over content-addressed storage.
#[derive(Clone)]
pub struct Graph {
    cas: Arc<dyn CasReader>,
}

impl Graph {
    pub fn new(cas: Arc<dyn CasReader>) -> Self {
        Self { cas }
    }
}

#[async_trait]
impl AnchorGraph for Graph {
    async fn read(&self, hl: &str) -> Result<AnchorCredential, OrbError> {
        let cid = hashlink::resource_hash(hl)?;

        let content = self
            .cas
            .read(cid)
            .await
            .map_err(|e| e.context(format!("read anchor [{hl}]")))?;

        serde_json::from_slice(&content)
            .map_err(|e| OrbError::Invalid(format!("decode anchor credential [{hl}]: {e}")))
    }

    async fn get_did_anchors(&self, cid: &str, suffix: &str) -> Result<Vec<Anchor>, OrbError> {
        let resource_hash = cid
            .rsplit(DID_DELIMITER)
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OrbError::Invalid(format!("no content address in [{cid}]")))?;

        let mut current = hashlink::from_resource_hash(resource_hash);
        let mut visited = HashSet::new();
        let mut anchors = Vec::new();

        loop {
            if !visited.insert(current.clone()) {
                return Err(OrbError::Invalid(format!(
                    "anchor graph cycle at [{current}] for suffix [{suffix}]"
                )));
            }

            let info = self.read(&current).await?;

            let previous = match info.anchor_payload() {
                Ok(payload) => match payload.previous_anchors.get(suffix) {
                    Some(prev) => Some(prev.clone()).filter(|p| !p.is_empty()),
                    None if anchors.is_empty() => {
                        return Err(OrbError::NotFound(format!(
                            "suffix [{suffix}] not referenced by anchor [{current}]"
                        )));
                    }
                    None => None,
                },
                // The starting anchor must be usable; older ones are handed to
                // the caller, which rejects them individually.
                Err(e) if anchors.is_empty() => return Err(e.context(format!("anchor [{current}]"))),
                Err(e) => {
                    tracing::warn!(anchor = %current, suffix, "stopping traversal at undecodable anchor: {e}");
                    None
                }
            };

            anchors.push(Anchor {
                cid: current,
                info,
            });

            match previous {
                Some(prev) => current = prev,
                None => break,
            }
        }

        anchors.reverse();

        tracing::debug!(cid, suffix, count = anchors.len(), "resolved did anchors");

        Ok(anchors)
    }
}
