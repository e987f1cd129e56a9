//! The normalized unit handed to a Sidetree transaction processor.

use serde::{Deserialize, Serialize};

/// An anchored Sidetree transaction.
///
/// `equivalent_references` is never empty, starts with the reference the
/// transaction was built from, and holds no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidetreeTransaction {
    /// Credential issuance instant, seconds since the epoch.
    pub transaction_time: u64,
    /// `<operation-count>.<core-index-uri>`.
    pub anchor_string: String,
    pub namespace: String,
    pub protocol_genesis_time: u64,
    /// Content address derived from the anchor's hashlink.
    pub canonical_reference: String,
    equivalent_references: Vec<String>,
}

impl SidetreeTransaction {
    /// Creates a transaction whose equivalence list starts with `reference`.
    pub fn new(
        transaction_time: u64,
        anchor_string: String,
        namespace: String,
        protocol_genesis_time: u64,
        canonical_reference: String,
        reference: String,
    ) -> Self {
        Self {
            transaction_time,
            anchor_string,
            namespace,
            protocol_genesis_time,
            canonical_reference,
            equivalent_references: vec![reference],
        }
    }

    /// Appends an alias unless it is already present.
    pub fn add_equivalent_reference(&mut self, reference: String) {
        if !self.equivalent_references.contains(&reference) {
            self.equivalent_references.push(reference);
        }
    }

    pub fn equivalent_references(&self) -> &[String] {
        &self.equivalent_references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_references_stay_unique_and_ordered() {
        let mut txn = SidetreeTransaction::new(
            10,
            "1.hl:core".into(),
            "did:orb".into(),
            0,
            "uEiABC".into(),
            "hl:uEiABC".into(),
        );
        txn.add_equivalent_reference("https:orb.domain1.com:uEiABC".into());
        txn.add_equivalent_reference("hl:uEiABC".into());

        assert_eq!(
            txn.equivalent_references(),
            ["hl:uEiABC", "https:orb.domain1.com:uEiABC"]
        );
    }
}
