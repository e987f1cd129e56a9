//! SQLite-backed stores for the Orb node.
//!
//! Every store wraps an `orb_db::DbPool` and owns one table created by the
//! `orb-db` migrations:
//!
//! | Store | Table | Invariant |
//! |-------|-------|-----------|
//! | [`UnpublishedOperationStore`] | `unpublished_operations` | at most one pending operation per suffix |
//! | [`VcStatusStore`] | `vc_status` | append-only; any `completed` event wins |
//! | [`DidAnchorStore`] | `did_anchors` | one anchor per suffix, bulk upserts are atomic |
//! | [`TransactionLog`] | `anchored_transactions` | one row per canonical reference |
//!
//! Stores are synchronous; async callers run them on the blocking pool.
//!
//! The node wires [`DidAnchorStore`] and [`TransactionLog`] into the observer
//! and resolver. [`UnpublishedOperationStore`] and [`VcStatusStore`] are
//! library-only: they back the operation-submission and proof-collection
//! paths, which this node does not serve.

mod didanchor;
mod error;
mod transaction;
mod unpublished;
mod vcstatus;

pub use didanchor::DidAnchorStore;
pub use error::StoreError;
pub use transaction::TransactionLog;
pub use unpublished::UnpublishedOperationStore;
pub use vcstatus::VcStatusStore;
