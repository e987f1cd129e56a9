//! Reverse index from DID unique suffix to the latest anchor referencing it.

use orb_db::DbPool;
use rusqlite::{params, OptionalExtension};

use crate::error::StoreError;

/// DID-to-anchor index.
#[derive(Clone)]
pub struct DidAnchorStore {
    pool: DbPool,
}

impl DidAnchorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Points every suffix in `suffixes` at `anchor` in a single transaction.
    ///
    /// Re-running the same call leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// A failed batch is retryable; nothing is written.
    pub fn put_bulk(&self, suffixes: &[String], anchor: &str) -> Result<(), StoreError> {
        if suffixes.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get()?;
        let batch_failed = |e| {
            StoreError::retryable(format!("failed to update did anchors for anchor[{anchor}]"), e)
        };

        let tx = conn.transaction().map_err(batch_failed)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO did_anchors (suffix, anchor) VALUES (?1, ?2)
                     ON CONFLICT(suffix) DO UPDATE SET
                        anchor = excluded.anchor,
                        updated_at = datetime('now')",
                )
                .map_err(batch_failed)?;
            for suffix in suffixes {
                stmt.execute(params![suffix, anchor]).map_err(batch_failed)?;
            }
        }
        tx.commit().map_err(batch_failed)?;

        tracing::debug!(count = suffixes.len(), anchor, "updated did anchor references");

        Ok(())
    }

    /// Returns the latest anchor recorded for `suffix`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the suffix was never indexed.
    pub fn get(&self, suffix: &str) -> Result<String, StoreError> {
        let conn = self.pool.get()?;

        conn.query_row(
            "SELECT anchor FROM did_anchors WHERE suffix = ?1",
            params![suffix],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("anchor for suffix[{suffix}]")))
    }
}
