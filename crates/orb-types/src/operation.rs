//! DID operations awaiting publication.

use serde::{Deserialize, Serialize};

/// Sidetree operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Recover,
    Deactivate,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Recover => "recover",
            Self::Deactivate => "deactivate",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw DID operation keyed by its unique suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredOperation {
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub unique_suffix: String,
    /// The original operation request as submitted by the client.
    pub operation_request: serde_json::Value,
    #[serde(default)]
    pub transaction_time: u64,
    #[serde(default)]
    pub transaction_number: u64,
    #[serde(default)]
    pub protocol_genesis_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<String>,
}
