//! Protocol versions from configuration.
//!
//! Every configured version shares one transaction processor, which records
//! anchored transactions in the [`TransactionLog`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use orb_observer::{ProtocolClient, ProtocolClientProvider, ProtocolVersion, TransactionProcessor};
use orb_store::TransactionLog;
use orb_types::{OrbError, SidetreeTransaction};

use crate::config::NamespaceConfig;

/// Namespace -> protocol client, fixed at startup.
pub struct StaticProtocolProvider {
    clients: BTreeMap<String, Arc<StaticProtocolClient>>,
}

impl StaticProtocolProvider {
    pub fn new(namespaces: &[NamespaceConfig], processor: Arc<dyn TransactionProcessor>) -> Self {
        let clients = namespaces
            .iter()
            .map(|ns| {
                let client = StaticProtocolClient::new(&ns.namespace, &ns.versions, &processor);
                (ns.namespace.clone(), Arc::new(client))
            })
            .collect();

        Self { clients }
    }
}

impl ProtocolClientProvider for StaticProtocolProvider {
    fn for_namespace(&self, namespace: &str) -> Result<Arc<dyn ProtocolClient>, OrbError> {
        self.clients
            .get(namespace)
            .map(|c| Arc::clone(c) as Arc<dyn ProtocolClient>)
            .ok_or_else(|| OrbError::Invalid(format!("namespace [{namespace}] not supported")))
    }
}

/// Versions of one namespace, sorted by genesis time.
pub struct StaticProtocolClient {
    namespace: String,
    versions: Vec<Arc<StaticVersion>>,
}

impl StaticProtocolClient {
    fn new(namespace: &str, genesis_times: &[u64], processor: &Arc<dyn TransactionProcessor>) -> Self {
        let mut times = genesis_times.to_vec();
        times.sort_unstable();
        times.dedup();

        let versions = times
            .into_iter()
            .map(|genesis_time| {
                Arc::new(StaticVersion {
                    genesis_time,
                    processor: Arc::clone(processor),
                })
            })
            .collect();

        Self {
            namespace: namespace.to_string(),
            versions,
        }
    }
}

impl ProtocolClient for StaticProtocolClient {
    /// Returns the version with the greatest genesis time not after
    /// `genesis_time`.
    fn get(&self, genesis_time: u64) -> Result<Arc<dyn ProtocolVersion>, OrbError> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.genesis_time <= genesis_time)
            .map(|v| Arc::clone(v) as Arc<dyn ProtocolVersion>)
            .ok_or_else(|| {
                OrbError::Invalid(format!(
                    "protocol version not found for namespace [{}] and time [{genesis_time}]",
                    self.namespace
                ))
            })
    }
}

struct StaticVersion {
    genesis_time: u64,
    processor: Arc<dyn TransactionProcessor>,
}

impl ProtocolVersion for StaticVersion {
    fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    fn transaction_processor(&self) -> Arc<dyn TransactionProcessor> {
        Arc::clone(&self.processor)
    }
}

/// Records every processed transaction once.
pub struct TransactionLogProcessor {
    log: TransactionLog,
}

impl TransactionLogProcessor {
    pub fn new(log: TransactionLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl TransactionProcessor for TransactionLogProcessor {
    async fn process(&self, txn: SidetreeTransaction, suffixes: &[String]) -> Result<(), OrbError> {
        let log = self.log.clone();
        let canonical = txn.canonical_reference.clone();

        let recorded = tokio::task::spawn_blocking(move || log.record(&txn))
            .await
            .map_err(|e| OrbError::Transient(format!("transaction log task failed: {e}")))??;

        if recorded {
            tracing::debug!(canonical_reference = %canonical, scope = suffixes.len(), "recorded anchored transaction");
        } else {
            tracing::debug!(canonical_reference = %canonical, "anchored transaction already recorded");
        }

        Ok(())
    }
}
