//! Proof-collection status of a verifiable credential.

use serde::{Deserialize, Serialize};

/// Witness proof-collection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcStatus {
    /// Proofs are still being collected.
    #[serde(rename = "in-process")]
    InProcess,
    /// Enough proofs have been collected. Terminal.
    #[serde(rename = "completed")]
    Completed,
}

impl VcStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProcess => "in-process",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for VcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
