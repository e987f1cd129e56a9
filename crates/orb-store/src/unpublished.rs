//! Pending DID operations that have not been anchored yet.
//!
//! A suffix may have at most one pending operation. A second submission is
//! rejected rather than overwritten; callers delete the record (individually
//! or in bulk once the batch is anchored) before resubmitting.

use orb_db::DbPool;
use orb_types::AnchoredOperation;
use rusqlite::{ffi, params, OptionalExtension};

use crate::error::StoreError;

/// Store of unpublished operations keyed by unique suffix.
#[derive(Clone)]
pub struct UnpublishedOperationStore {
    pool: DbPool,
}

impl UnpublishedOperationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Saves an unpublished operation.
    ///
    /// The insert relies on the primary key of `unpublished_operations`, so
    /// two writers racing on the same suffix cannot both succeed.
    ///
    /// # Errors
    ///
    /// - `StoreError::EmptySuffix` if the operation has no unique suffix.
    /// - `StoreError::PendingOperation` if a record already exists.
    pub fn put(&self, op: &AnchoredOperation) -> Result<(), StoreError> {
        if op.unique_suffix.is_empty() {
            return Err(StoreError::EmptySuffix);
        }

        let op_json = serde_json::to_string(op)?;
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT INTO unpublished_operations (suffix, operation_type, operation_json)
             VALUES (?1, ?2, ?3)",
            params![op.unique_suffix, op.operation_type.as_str(), op_json],
        );

        match inserted {
            Ok(_) => {
                tracing::debug!(
                    suffix = %op.unique_suffix,
                    operation_type = %op.operation_type,
                    "stored unpublished operation"
                );
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(StoreError::PendingOperation(op.unique_suffix.clone()))
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Retrieves the pending operation for `suffix`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no operation is pending.
    pub fn get(&self, suffix: &str) -> Result<AnchoredOperation, StoreError> {
        let conn = self.pool.get()?;

        let op_json: Option<String> = conn
            .query_row(
                "SELECT operation_json FROM unpublished_operations WHERE suffix = ?1",
                params![suffix],
                |row| row.get(0),
            )
            .optional()?;

        let op_json = op_json
            .ok_or_else(|| StoreError::NotFound(format!("unpublished operation for suffix[{suffix}]")))?;

        Ok(serde_json::from_str(&op_json)?)
    }

    /// Deletes the pending operation for `suffix`. Deleting a missing record
    /// is not an error.
    pub fn delete(&self, suffix: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM unpublished_operations WHERE suffix = ?1",
            params![suffix],
        )?;
        Ok(())
    }

    /// Deletes the pending operations for all `suffixes` in one transaction.
    ///
    /// # Errors
    ///
    /// A failed batch is reported as retryable; the caller should retry the
    /// whole batch.
    pub fn delete_all(&self, suffixes: &[String]) -> Result<(), StoreError> {
        if suffixes.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get()?;
        let batch_failed = |e| StoreError::retryable("failed to delete unpublished operations", e);

        let tx = conn.transaction().map_err(batch_failed)?;
        {
            let mut stmt = tx
                .prepare("DELETE FROM unpublished_operations WHERE suffix = ?1")
                .map_err(batch_failed)?;
            for suffix in suffixes {
                stmt.execute(params![suffix]).map_err(batch_failed)?;
            }
        }
        tx.commit().map_err(batch_failed)?;

        tracing::debug!(count = suffixes.len(), "deleted unpublished operations");

        Ok(())
    }
}
