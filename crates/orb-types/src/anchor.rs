//! Anchor references, anchor credentials, and the decoded anchor payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrbError;

/// A reference to a local or remote anchor, as carried on the anchor topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorInfo {
    /// Content address of the anchor credential. Acts as the idempotency key.
    pub hashlink: String,
    /// Alias of the same content in the local CAS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_hashlink: Option<String>,
    /// Actor IRI of the anchor's originator. `None` means no acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributed_to: Option<String>,
}

impl AnchorInfo {
    /// Creates a reference with only a hashlink.
    pub fn new(hashlink: impl Into<String>) -> Self {
        Self {
            hashlink: hashlink.into(),
            local_hashlink: None,
            attributed_to: None,
        }
    }

    /// Returns the originator, treating an empty string as absent.
    pub fn originator(&self) -> Option<&str> {
        self.attributed_to.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns the local hashlink, treating an empty string as absent.
    pub fn local(&self) -> Option<&str> {
        self.local_hashlink.as_deref().filter(|s| !s.is_empty())
    }
}

/// Verifiable credential describing an anchored transaction.
///
/// Only the fields the observer relies on are typed; the proof is carried
/// opaquely since its verification belongs to the credential layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorCredential {
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Issuance instant; becomes the Sidetree transaction time.
    pub issuance_date: DateTime<Utc>,
    /// Encoded [`AnchorPayload`].
    pub credential_subject: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<serde_json::Value>,
}

impl AnchorCredential {
    /// Decodes the credential subject into an [`AnchorPayload`].
    ///
    /// # Errors
    ///
    /// Returns [`OrbError::Invalid`] if the subject is malformed or names no
    /// namespace.
    pub fn anchor_payload(&self) -> Result<AnchorPayload, OrbError> {
        let payload: AnchorPayload = serde_json::from_value(self.credential_subject.clone())
            .map_err(|e| OrbError::Invalid(format!("decode anchor subject: {e}")))?;

        if payload.namespace.is_empty() {
            return Err(OrbError::invalid("anchor subject has no namespace"));
        }

        Ok(payload)
    }

    /// Issuance time in seconds since the Unix epoch, clamped at zero.
    pub fn transaction_time(&self) -> u64 {
        u64::try_from(self.issuance_date.timestamp()).unwrap_or(0)
    }
}

/// Decoded subject of an anchor credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPayload {
    /// DID method namespace, e.g. `did:orb`.
    pub namespace: String,
    /// Protocol genesis time selecting the protocol rules.
    pub version: u64,
    #[serde(default)]
    pub operation_count: u64,
    #[serde(rename = "coreIndex", default)]
    pub core_index_uri: String,
    /// Unique suffix -> hashlink of the anchor the suffix last appeared in.
    #[serde(default)]
    pub previous_anchors: BTreeMap<String, String>,
}

impl AnchorPayload {
    /// Sidetree anchor string: `<operation-count>.<core-index-uri>`.
    pub fn anchor_string(&self) -> String {
        format!("{}.{}", self.operation_count, self.core_index_uri)
    }

    /// Suffixes updated by this anchor, in key order.
    pub fn updated_suffixes(&self) -> Vec<String> {
        self.previous_anchors.keys().cloned().collect()
    }
}
