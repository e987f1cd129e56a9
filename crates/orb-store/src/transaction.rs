//! Log of Sidetree transactions accepted by this node.

use orb_db::DbPool;
use orb_types::SidetreeTransaction;
use rusqlite::{params, OptionalExtension};

use crate::error::StoreError;

/// Idempotent record of anchored transactions, keyed by canonical reference.
#[derive(Clone)]
pub struct TransactionLog {
    pool: DbPool,
}

impl TransactionLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Records `txn`. Returns `false` if the canonical reference was already
    /// present, in which case the stored row is left untouched.
    pub fn record(&self, txn: &SidetreeTransaction) -> Result<bool, StoreError> {
        let refs_json = serde_json::to_string(txn.equivalent_references())?;
        let conn = self.pool.get()?;

        let inserted = conn
            .execute(
                "INSERT INTO anchored_transactions (
                    canonical_reference, namespace, protocol_genesis_time,
                    transaction_time, anchor_string, equivalent_references_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(canonical_reference) DO NOTHING",
                params![
                    txn.canonical_reference,
                    txn.namespace,
                    txn.protocol_genesis_time as i64,
                    txn.transaction_time as i64,
                    txn.anchor_string,
                    refs_json,
                ],
            )
            .map_err(|e| {
                StoreError::retryable(
                    format!("failed to record transaction[{}]", txn.canonical_reference),
                    e,
                )
            })?;

        Ok(inserted > 0)
    }

    /// Returns the transaction recorded under `canonical_reference`.
    pub fn get(&self, canonical_reference: &str) -> Result<Option<SidetreeTransaction>, StoreError> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                "SELECT namespace, protocol_genesis_time, transaction_time, anchor_string,
                        equivalent_references_json
                 FROM anchored_transactions WHERE canonical_reference = ?1",
                params![canonical_reference],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((namespace, genesis_time, txn_time, anchor_string, refs_json)) = row else {
            return Ok(None);
        };

        let refs: Vec<String> = serde_json::from_str(&refs_json)?;
        let mut refs = refs.into_iter();
        let first = refs.next().unwrap_or_else(|| canonical_reference.to_string());

        let mut txn = SidetreeTransaction::new(
            txn_time as u64,
            anchor_string,
            namespace,
            genesis_time as u64,
            canonical_reference.to_string(),
            first,
        );
        for r in refs {
            txn.add_equivalent_reference(r);
        }

        Ok(Some(txn))
    }

    /// Number of transactions recorded for `namespace`.
    pub fn count(&self, namespace: &str) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM anchored_transactions WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    fn txn() -> SidetreeTransaction {
        let mut txn = SidetreeTransaction::new(
            1_611_739_810,
            "1.hl:uEiCore".into(),
            "did:orb".into(),
            0,
            "uEiABC".into(),
            "hl:uEiABC".into(),
        );
        txn.add_equivalent_reference("https:orb.domain1.com:uEiABC".into());
        txn
    }

    #[test]
    fn record_is_idempotent() {
        let (_dir, pool) = test_pool();
        let log = TransactionLog::new(pool);

        assert!(log.record(&txn()).unwrap());
        assert!(!log.record(&txn()).unwrap(), "redelivery must not add a row");
        assert_eq!(log.count("did:orb").unwrap(), 1);
    }

    #[test]
    fn get_restores_transaction() {
        let (_dir, pool) = test_pool();
        let log = TransactionLog::new(pool);

        log.record(&txn()).unwrap();
        assert_eq!(log.get("uEiABC").unwrap(), Some(txn()));
        assert_eq!(log.get("missing").unwrap(), None);
    }
}
