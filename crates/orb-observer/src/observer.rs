//! Anchor and DID processing.
//!
//! [`Observer`] owns the pub/sub bridge and the processing core. Anchors
//! arriving on the anchor topic are read from the anchor graph, handed to
//! the protocol version's transaction processor and recorded in the
//! DID-to-anchor index. DIDs arriving on the DID topic are caught up by
//! processing every anchor the graph knows for them.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use orb_types::{hashlink, Activity, AnchorCredential, AnchorInfo, OrbError, SidetreeTransaction, DID_DELIMITER};
use url::Url;

use crate::providers::Providers;
use crate::pubsub::{AnchorHandler, DidHandler, PubSubBridge, Publisher};

/// Recognised observer options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Domain used to build a second, human-routable equivalent reference
    /// (`https:<domain>:<canonical-reference>`) for every anchor.
    pub discovery_domain: Option<String>,
}

impl ObserverConfig {
    pub fn validate(&self) -> Result<(), OrbError> {
        if let Some(domain) = &self.discovery_domain {
            if domain.is_empty() || domain.chars().any(char::is_whitespace) {
                return Err(OrbError::Invalid(format!(
                    "invalid discovery domain [{domain}]"
                )));
            }
        }
        Ok(())
    }
}

/// Consumes the anchor and DID topics.
pub struct Observer {
    bridge: Arc<PubSubBridge>,
    core: Arc<ObserverCore>,
}

impl Observer {
    pub async fn new(providers: Providers, config: ObserverConfig) -> Result<Self, OrbError> {
        config.validate()?;

        let core = Arc::new(ObserverCore { providers, config });

        let bridge = PubSubBridge::new(
            Arc::clone(&core.providers.pubsub),
            Arc::clone(&core) as Arc<dyn AnchorHandler>,
            Arc::clone(&core) as Arc<dyn DidHandler>,
        )
        .await?;

        Ok(Self {
            bridge: Arc::new(bridge),
            core,
        })
    }

    /// Starts consuming both topics.
    pub fn start(&self) {
        self.bridge.start();
    }

    /// Stops consumption and closes the broker. Nothing should be published
    /// after this returns.
    pub async fn stop(&self) {
        self.bridge.stop().await;
    }

    /// Returns the capability producers use to enqueue anchors and DIDs.
    pub fn publisher(&self) -> Arc<dyn Publisher> {
        Arc::clone(&self.bridge) as Arc<dyn Publisher>
    }

    /// Processes one anchor synchronously, bypassing the broker.
    pub async fn handle_anchor(&self, info: AnchorInfo) -> Result<(), OrbError> {
        self.core.observe_anchor(info).await
    }

    /// Processes every anchor known for `did` synchronously, bypassing the
    /// broker.
    pub async fn process_did(&self, did: &str) -> Result<(), OrbError> {
        self.core.process_did(did).await
    }
}

struct ObserverCore {
    providers: Providers,
    config: ObserverConfig,
}

#[async_trait]
impl AnchorHandler for ObserverCore {
    async fn handle_anchor(&self, info: AnchorInfo) -> Result<(), OrbError> {
        self.observe_anchor(info).await
    }
}

#[async_trait]
impl DidHandler for ObserverCore {
    async fn handle_did(&self, did: String) -> Result<(), OrbError> {
        self.process_did(&did).await
    }
}

impl ObserverCore {
    async fn observe_anchor(&self, info: AnchorInfo) -> Result<(), OrbError> {
        let started = Instant::now();
        let result = self.handle_anchor_inner(&info).await;
        self.providers.metrics.process_anchor_time(started.elapsed());
        result
    }

    async fn handle_anchor_inner(&self, info: &AnchorInfo) -> Result<(), OrbError> {
        tracing::debug!(hashlink = %info.hashlink, "observing anchor");

        let credential = self
            .providers
            .anchor_graph
            .read(&info.hashlink)
            .await
            .inspect_err(|e| {
                tracing::warn!(hashlink = %info.hashlink, error = %e, "failed to read anchor")
            })?;

        self.process_anchor(&info.hashlink, &credential, info, &[]).await
    }

    async fn process_did(&self, did: &str) -> Result<(), OrbError> {
        let started = Instant::now();
        let result = self.process_did_inner(did).await;
        self.providers.metrics.process_did_time(started.elapsed());
        result
    }

    async fn process_did_inner(&self, did: &str) -> Result<(), OrbError> {
        tracing::debug!(did, "processing out-of-system DID");

        let (cid, suffix) = did
            .rsplit_once(DID_DELIMITER)
            .ok_or_else(|| OrbError::Invalid(format!("invalid DID format [{did}]")))?;

        let anchors = self
            .providers
            .anchor_graph
            .get_did_anchors(cid, suffix)
            .await
            .map_err(|e| e.context(format!("get anchors for DID [{did}]")))?;

        tracing::debug!(did, count = anchors.len(), "processing anchors for DID");

        let scope = [suffix.to_string()];

        for anchor in anchors {
            let info = AnchorInfo::new(anchor.cid.clone());

            match self.process_anchor(&anchor.cid, &anchor.info, &info, &scope).await {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    return Err(e.context(format!(
                        "process out-of-system anchor [{}]",
                        anchor.cid
                    )));
                }
                Err(e) => {
                    tracing::warn!(
                        did,
                        anchor = %anchor.cid,
                        error = %e,
                        "skipping out-of-system anchor"
                    );
                }
            }
        }

        Ok(())
    }

    /// Ingests one anchor. A non-empty `suffixes` restricts processing to
    /// those DIDs; every suffix the anchor updates is indexed regardless.
    async fn process_anchor(
        &self,
        hashlink: &str,
        credential: &AnchorCredential,
        info: &AnchorInfo,
        suffixes: &[String],
    ) -> Result<(), OrbError> {
        let payload = credential
            .anchor_payload()
            .map_err(|e| e.context(format!("anchor payload of [{hashlink}]")))?;

        let client = self
            .providers
            .protocol_client_provider
            .for_namespace(&payload.namespace)
            .map_err(|e| e.context(format!("protocol client for namespace [{}]", payload.namespace)))?;

        let version = client
            .get(payload.version)
            .map_err(|e| e.context(format!("protocol version [{}]", payload.version)))?;

        let canonical_reference = hashlink::resource_hash(hashlink)?.to_string();

        let mut txn = SidetreeTransaction::new(
            credential.transaction_time(),
            payload.anchor_string(),
            payload.namespace.clone(),
            payload.version,
            canonical_reference.clone(),
            hashlink.to_string(),
        );

        if let Some(domain) = &self.config.discovery_domain {
            txn.add_equivalent_reference(format!("https:{domain}:{canonical_reference}"));
        }

        version
            .transaction_processor()
            .process(txn, suffixes)
            .await
            .map_err(|e| e.context(format!("process anchor [{hashlink}]")))?;

        let updated = payload.updated_suffixes();
        let indexed = updated.len();

        self.index(updated, hashlink).await?;

        tracing::info!(
            hashlink,
            namespace = %payload.namespace,
            protocol_version = version.genesis_time(),
            suffixes = indexed,
            "processed anchor"
        );

        if let Err(e) = self.post_like(hashlink, info).await {
            tracing::warn!(hashlink, error = %e, "failed to post Like activity");
        }

        Ok(())
    }

    async fn index(&self, suffixes: Vec<String>, hashlink: &str) -> Result<(), OrbError> {
        if suffixes.is_empty() {
            return Ok(());
        }

        let did_anchors = Arc::clone(&self.providers.did_anchors);
        let anchor = hashlink.to_string();

        tokio::task::spawn_blocking(move || did_anchors.put_bulk(&suffixes, &anchor))
            .await
            .map_err(|e| OrbError::Transient(format!("index task failed: {e}")))?
            .map_err(|e| e.context(format!("update DID anchor index for [{hashlink}]")))
    }

    async fn post_like(&self, hashlink: &str, info: &AnchorInfo) -> Result<(), OrbError> {
        let Some(originator) = info.originator() else {
            return Ok(());
        };

        let anchor = parse_url(hashlink)?;
        let actor = parse_url(originator)?;
        let local = info.local().map(parse_url).transpose()?;

        let like = Activity::like(anchor, actor, local, Utc::now());

        let outbox = (self.providers.outbox)();
        let id = outbox.post(&like).await?;

        tracing::debug!(hashlink, activity = %id, "posted Like activity");

        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url, OrbError> {
    Url::parse(raw).map_err(|e| OrbError::Invalid(format!("parse URL [{raw}]: {e}")))
}
