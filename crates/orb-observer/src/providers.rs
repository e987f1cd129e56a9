//! Narrow capabilities the observer consumes.
//!
//! Each collaborator is injected as a trait object so the observer never
//! holds a full storage or transport handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orb_graph::AnchorGraph;
use orb_store::DidAnchorStore;
use orb_types::{Activity, OrbError, SidetreeTransaction};
use url::Url;

use crate::broker::PubSub;

/// Resolves protocol clients by DID method namespace.
pub trait ProtocolClientProvider: Send + Sync {
    fn for_namespace(&self, namespace: &str) -> Result<Arc<dyn ProtocolClient>, OrbError>;
}

/// Selects protocol versions for one namespace.
pub trait ProtocolClient: Send + Sync {
    /// Returns the protocol version in force at `genesis_time`.
    fn get(&self, genesis_time: u64) -> Result<Arc<dyn ProtocolVersion>, OrbError>;
}

/// One version of the protocol rules.
pub trait ProtocolVersion: Send + Sync {
    fn genesis_time(&self) -> u64;
    fn transaction_processor(&self) -> Arc<dyn TransactionProcessor>;
}

/// Ingests the operations of an anchored transaction.
///
/// Implementations must be idempotent: the same transaction may be
/// delivered again after a transient failure.
#[async_trait]
pub trait TransactionProcessor: Send + Sync {
    /// Processes `txn`. A non-empty `suffixes` restricts processing to those
    /// DIDs.
    async fn process(&self, txn: SidetreeTransaction, suffixes: &[String]) -> Result<(), OrbError>;
}

/// Write side of the DID-to-anchor index.
pub trait DidAnchors: Send + Sync {
    fn put_bulk(&self, suffixes: &[String], anchor: &str) -> Result<(), OrbError>;
}

impl DidAnchors for DidAnchorStore {
    fn put_bulk(&self, suffixes: &[String], anchor: &str) -> Result<(), OrbError> {
        Ok(DidAnchorStore::put_bulk(self, suffixes, anchor)?)
    }
}

/// An ActivityPub outbox.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Posts `activity`, returning the ID assigned to it.
    async fn post(&self, activity: &Activity) -> Result<Url, OrbError>;
}

/// Produces the outbox to post to. Resolved per post so the outbox may be
/// started after the observer.
pub type OutboxProvider = Arc<dyn Fn() -> Arc<dyn Outbox> + Send + Sync>;

/// Processing-duration sink.
pub trait Metrics: Send + Sync {
    fn process_anchor_time(&self, elapsed: Duration);
    fn process_did_time(&self, elapsed: Duration);
}

/// Everything the observer needs from the rest of the node.
#[derive(Clone)]
pub struct Providers {
    pub protocol_client_provider: Arc<dyn ProtocolClientProvider>,
    pub anchor_graph: Arc<dyn AnchorGraph>,
    pub did_anchors: Arc<dyn DidAnchors>,
    pub pubsub: Arc<dyn PubSub>,
    pub metrics: Arc<dyn Metrics>,
    pub outbox: OutboxProvider,
}
