//! Proof-collection status events for verifiable credentials.
//!
//! Events are appended, never overwritten, and tagged with the base64url
//! encoding of the credential ID. Once any event for a credential reads
//! `completed`, the credential's status is `completed` for good.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use orb_db::DbPool;
use orb_types::VcStatus;
use rusqlite::params;

use crate::error::StoreError;

/// Append-only store of credential status events.
#[derive(Clone)]
pub struct VcStatusStore {
    pool: DbPool,
}

fn vc_tag(vc_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(vc_id.as_bytes())
}

impl VcStatusStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Appends a status event for `vc_id`.
    ///
    /// # Errors
    ///
    /// Storage failures are retryable.
    pub fn add_status(&self, vc_id: &str, status: VcStatus) -> Result<(), StoreError> {
        let status_json = serde_json::to_string(&status)?;
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO vc_status (event_id, vc_tag, status_json) VALUES (?1, ?2, ?3)",
            params![uuid::Uuid::new_v4().to_string(), vc_tag(vc_id), status_json],
        )
        .map_err(|e| {
            StoreError::retryable(format!("failed to store vcID[{vc_id}] status '{status}'"), e)
        })?;

        tracing::debug!(vc_id, %status, "stored vc status");

        Ok(())
    }

    /// Returns the collection status for `vc_id`.
    ///
    /// Events are scanned in the order they were appended. The scan stops at
    /// the first `completed` event; otherwise the last event's status is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no events exist for the credential.
    /// - Retryable errors if the scan fails part way.
    pub fn get_status(&self, vc_id: &str) -> Result<VcStatus, StoreError> {
        let conn = self.pool.get()?;
        let scan_failed =
            |e| StoreError::retryable(format!("failed to get statuses for vcID[{vc_id}]"), e);

        let mut stmt = conn
            .prepare("SELECT status_json FROM vc_status WHERE vc_tag = ?1 ORDER BY seq ASC")
            .map_err(scan_failed)?;
        let mut rows = stmt.query(params![vc_tag(vc_id)]).map_err(scan_failed)?;

        let mut last = None;

        while let Some(row) = rows.next().map_err(scan_failed)? {
            let status_json: String = row.get(0).map_err(scan_failed)?;
            let status: VcStatus = serde_json::from_str(&status_json)?;

            if status == VcStatus::Completed {
                return Ok(VcStatus::Completed);
            }

            last = Some(status);
        }

        let status =
            last.ok_or_else(|| StoreError::NotFound(format!("status for vcID[{vc_id}]")))?;

        tracing::debug!(vc_id, %status, "resolved vc status");

        Ok(status)
    }
}
