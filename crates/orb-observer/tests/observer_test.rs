//! Observer scenarios against in-memory collaborators and a real SQLite
//! DID-anchor index.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orb_db::{create_pool, run_migrations, DbRuntimeSettings};
use orb_graph::{Anchor, AnchorGraph};
use orb_observer::{
    DidAnchors, MemPubSub, MemPubSubConfig, Observer, ObserverConfig, Outbox, OutboxProvider,
    ProcessingMetrics, ProtocolClient, ProtocolClientProvider, ProtocolVersion, Providers,
    Publisher, TransactionProcessor,
};
use orb_store::DidAnchorStore;
use orb_types::{Activity, AnchorCredential, AnchorInfo, OrbError, SidetreeTransaction};
use serde_json::json;
use tempfile::TempDir;
use url::Url;

fn credential(namespace: &str, version: u64, previous: serde_json::Value) -> AnchorCredential {
    serde_json::from_value(json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential", "AnchorCredential"],
        "issuer": "https://peer.example.com",
        "issuanceDate": "2021-01-27T09:30:10Z",
        "credentialSubject": {
            "namespace": namespace,
            "version": version,
            "operationCount": 1,
            "coreIndex": "hl:uEiCore",
            "previousAnchors": previous,
        }
    }))
    .unwrap()
}

fn broken_credential() -> AnchorCredential {
    serde_json::from_value(json!({
        "issuanceDate": "2021-01-27T09:30:10Z",
        "credentialSubject": "not a payload",
    }))
    .unwrap()
}

#[derive(Default)]
struct FakeGraph {
    anchors: HashMap<String, AnchorCredential>,
    did_anchors: Vec<Anchor>,
    read_error: Option<OrbError>,
}

#[async_trait]
impl AnchorGraph for FakeGraph {
    async fn read(&self, hashlink: &str) -> Result<AnchorCredential, OrbError> {
        if let Some(e) = &self.read_error {
            return Err(e.clone());
        }
        self.anchors
            .get(hashlink)
            .cloned()
            .ok_or_else(|| OrbError::NotFound(hashlink.to_string()))
    }

    async fn get_did_anchors(&self, _cid: &str, _suffix: &str) -> Result<Vec<Anchor>, OrbError> {
        Ok(self.did_anchors.clone())
    }
}

/// Records processed transactions; fails transiently `failures` times first.
#[derive(Default)]
struct FakeProcessor {
    processed: Mutex<Vec<(SidetreeTransaction, Vec<String>)>>,
    failures: Mutex<u32>,
}

#[async_trait]
impl TransactionProcessor for FakeProcessor {
    async fn process(&self, txn: SidetreeTransaction, suffixes: &[String]) -> Result<(), OrbError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(OrbError::transient("operation store unavailable"));
            }
        }
        self.processed.lock().unwrap().push((txn, suffixes.to_vec()));
        Ok(())
    }
}

struct FakeVersion(Arc<FakeProcessor>);

impl ProtocolVersion for FakeVersion {
    fn genesis_time(&self) -> u64 {
        0
    }

    fn transaction_processor(&self) -> Arc<dyn TransactionProcessor> {
        Arc::clone(&self.0) as Arc<dyn TransactionProcessor>
    }
}

struct FakeProtocol(Arc<FakeProcessor>);

impl ProtocolClientProvider for FakeProtocol {
    fn for_namespace(&self, namespace: &str) -> Result<Arc<dyn ProtocolClient>, OrbError> {
        if namespace != "did:orb" {
            return Err(OrbError::Invalid(format!("namespace [{namespace}] not supported")));
        }
        Ok(Arc::new(FakeProtocol(Arc::clone(&self.0))))
    }
}

impl ProtocolClient for FakeProtocol {
    fn get(&self, _genesis_time: u64) -> Result<Arc<dyn ProtocolVersion>, OrbError> {
        Ok(Arc::new(FakeVersion(Arc::clone(&self.0))))
    }
}

#[derive(Default)]
struct FakeOutbox {
    posted: Mutex<Vec<Activity>>,
    fail: bool,
}

#[async_trait]
impl Outbox for FakeOutbox {
    async fn post(&self, activity: &Activity) -> Result<Url, OrbError> {
        if self.fail {
            return Err(OrbError::transient("outbox unavailable"));
        }
        self.posted.lock().unwrap().push(activity.clone());
        Ok(Url::parse("https://orb.domain1.com/activities/1").unwrap())
    }
}

struct Harness {
    _dir: TempDir,
    index: Arc<DidAnchorStore>,
    processor: Arc<FakeProcessor>,
    outbox: Arc<FakeOutbox>,
    metrics: Arc<ProcessingMetrics>,
    observer: Observer,
}

async fn harness(graph: FakeGraph, outbox: FakeOutbox, config: ObserverConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orb.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    let index = Arc::new(DidAnchorStore::new(pool));
    let processor = Arc::new(FakeProcessor::default());
    let outbox = Arc::new(outbox);
    let metrics = Arc::new(ProcessingMetrics::new());

    let outbox_for_provider = Arc::clone(&outbox);
    let outbox_provider: OutboxProvider =
        Arc::new(move || Arc::clone(&outbox_for_provider) as Arc<dyn Outbox>);

    let providers = Providers {
        protocol_client_provider: Arc::new(FakeProtocol(Arc::clone(&processor))),
        anchor_graph: Arc::new(graph),
        did_anchors: Arc::clone(&index) as Arc<dyn DidAnchors>,
        pubsub: Arc::new(MemPubSub::new(MemPubSubConfig {
            buffer_size: 10,
            redelivery_delay: Duration::from_millis(10),
            max_redeliveries: 5,
        })),
        metrics: Arc::clone(&metrics) as Arc<dyn orb_observer::Metrics>,
        outbox: outbox_provider,
    };

    let observer = Observer::new(providers, config).await.unwrap();

    Harness {
        _dir: dir,
        index,
        processor,
        outbox,
        metrics,
        observer,
    }
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

fn peer_anchor() -> AnchorInfo {
    AnchorInfo {
        hashlink: "hl:abc".to_string(),
        local_hashlink: None,
        attributed_to: Some("https://peer/actor".to_string()),
    }
}

#[tokio::test]
async fn handle_anchor_indexes_suffixes_and_posts_like() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 1, json!({"suffixA": "hl:prev"})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    h.observer.handle_anchor(peer_anchor()).await.unwrap();

    assert_eq!(h.index.get("suffixA").unwrap(), "hl:abc");

    let posted = h.outbox.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].object.url.as_str(), "hl:abc");
    assert_eq!(posted[0].to[0], "https://peer/actor");
    assert!(posted[0].result.is_none());

    let processed = h.processor.processed.lock().unwrap();
    assert_eq!(processed.len(), 1);
    let (txn, scope) = &processed[0];
    assert!(scope.is_empty());
    assert_eq!(txn.canonical_reference, "abc");
    assert_eq!(txn.anchor_string, "1.hl:uEiCore");
    assert_eq!(txn.namespace, "did:orb");
    assert_eq!(txn.transaction_time, 1611739810);
    assert_eq!(txn.protocol_genesis_time, 1);
    assert_eq!(txn.equivalent_references(), ["hl:abc"]);

    assert_eq!(h.metrics.snapshot().anchors_processed, 1);
}

#[tokio::test]
async fn transaction_carries_anchor_protocol_version() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 5, json!({"s1": ""})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    h.observer.handle_anchor(AnchorInfo::new("hl:abc")).await.unwrap();

    // The resolved version starts at genesis 0; the transaction keeps the anchor's.
    let processed = h.processor.processed.lock().unwrap();
    assert_eq!(processed[0].0.protocol_genesis_time, 5);
}

#[tokio::test]
async fn discovery_domain_adds_equivalent_reference() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 0, json!({"s1": ""})));

    let config = ObserverConfig {
        discovery_domain: Some("orb.domain1.com".into()),
    };
    let h = harness(graph, FakeOutbox::default(), config).await;

    h.observer.handle_anchor(AnchorInfo::new("hl:abc")).await.unwrap();

    let processed = h.processor.processed.lock().unwrap();
    assert_eq!(
        processed[0].0.equivalent_references(),
        ["hl:abc", "https:orb.domain1.com:abc"]
    );
    assert!(h.outbox.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn local_hashlink_becomes_like_result() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 0, json!({"s1": ""})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    let mut info = peer_anchor();
    info.local_hashlink = Some("hl:local".into());
    h.observer.handle_anchor(info).await.unwrap();

    let posted = h.outbox.posted.lock().unwrap();
    assert_eq!(posted[0].result.as_ref().unwrap().url.as_str(), "hl:local");
}

#[tokio::test]
async fn outbox_failure_does_not_fail_anchor() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 1, json!({"suffixA": ""})));

    let outbox = FakeOutbox {
        fail: true,
        ..Default::default()
    };
    let h = harness(graph, outbox, ObserverConfig::default()).await;

    h.observer.handle_anchor(peer_anchor()).await.unwrap();
    assert_eq!(h.index.get("suffixA").unwrap(), "hl:abc");
}

#[tokio::test]
async fn permanent_and_transient_failures_are_classified() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:bad".into(), broken_credential());
    graph
        .anchors
        .insert("hl:other".into(), credential("did:other", 0, json!({"s1": ""})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    let err = h.observer.handle_anchor(AnchorInfo::new("hl:bad")).await.unwrap_err();
    assert!(!err.is_transient());

    let err = h.observer.handle_anchor(AnchorInfo::new("hl:other")).await.unwrap_err();
    assert!(matches!(err, OrbError::Invalid(_)));

    let h = harness(
        FakeGraph {
            read_error: Some(OrbError::transient("cas unavailable")),
            ..Default::default()
        },
        FakeOutbox::default(),
        ObserverConfig::default(),
    )
    .await;

    let err = h.observer.handle_anchor(AnchorInfo::new("hl:abc")).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.metrics.snapshot().anchors_processed, 1);
}

#[tokio::test]
async fn reprocessing_an_anchor_is_idempotent() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 1, json!({"suffixA": "", "suffixB": ""})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    h.observer.handle_anchor(AnchorInfo::new("hl:abc")).await.unwrap();
    h.observer.handle_anchor(AnchorInfo::new("hl:abc")).await.unwrap();

    assert_eq!(h.index.get("suffixA").unwrap(), "hl:abc");
    assert_eq!(h.index.get("suffixB").unwrap(), "hl:abc");
}

#[tokio::test]
async fn process_did_skips_permanently_failing_anchor() {
    let graph = FakeGraph {
        did_anchors: vec![
            Anchor {
                cid: "hl:first".into(),
                info: broken_credential(),
            },
            Anchor {
                cid: "hl:second".into(),
                info: credential("did:orb", 0, json!({"suffixB": "hl:first", "suffixC": ""})),
            },
        ],
        ..Default::default()
    };

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;

    h.observer.process_did("did:orb:cidhint:suffixB").await.unwrap();

    assert_eq!(h.index.get("suffixB").unwrap(), "hl:second");
    assert_eq!(h.index.get("suffixC").unwrap(), "hl:second");
    assert!(h.outbox.posted.lock().unwrap().is_empty());

    let processed = h.processor.processed.lock().unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].1, ["suffixB"]);

    assert_eq!(h.metrics.snapshot().dids_processed, 1);
}

#[tokio::test]
async fn process_did_aborts_on_transient_failure() {
    let graph = FakeGraph {
        did_anchors: vec![
            Anchor {
                cid: "hl:first".into(),
                info: credential("did:orb", 0, json!({"suffixB": ""})),
            },
            Anchor {
                cid: "hl:second".into(),
                info: credential("did:orb", 0, json!({"suffixB": "hl:first"})),
            },
        ],
        ..Default::default()
    };

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;
    *h.processor.failures.lock().unwrap() = 1;

    let err = h.observer.process_did("did:orb:cidhint:suffixB").await.unwrap_err();
    assert!(err.is_transient());
    assert!(h.processor.processed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn process_did_rejects_did_without_delimiter() {
    let h = harness(FakeGraph::default(), FakeOutbox::default(), ObserverConfig::default()).await;

    let err = h.observer.process_did("nodelimiter").await.unwrap_err();
    assert!(matches!(err, OrbError::Invalid(_)));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orb.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();

    let processor = Arc::new(FakeProcessor::default());
    let providers = Providers {
        protocol_client_provider: Arc::new(FakeProtocol(processor)),
        anchor_graph: Arc::new(FakeGraph::default()),
        did_anchors: Arc::new(DidAnchorStore::new(pool)),
        pubsub: Arc::new(MemPubSub::default()),
        metrics: Arc::new(ProcessingMetrics::new()),
        outbox: Arc::new(|| Arc::new(FakeOutbox::default()) as Arc<dyn Outbox>),
    };

    let config = ObserverConfig {
        discovery_domain: Some(String::new()),
    };
    assert!(Observer::new(providers, config).await.is_err());
}

#[tokio::test]
async fn published_anchor_is_processed_after_transient_retry() {
    let mut graph = FakeGraph::default();
    graph
        .anchors
        .insert("hl:abc".into(), credential("did:orb", 1, json!({"suffixA": ""})));

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;
    *h.processor.failures.lock().unwrap() = 2;

    h.observer.start();
    h.observer.publisher().publish_anchor(&peer_anchor()).await.unwrap();

    wait_for(|| h.metrics.snapshot().anchors_processed >= 3).await;

    assert_eq!(h.index.get("suffixA").unwrap(), "hl:abc");
    assert_eq!(h.processor.processed.lock().unwrap().len(), 1);
    assert_eq!(h.outbox.posted.lock().unwrap().len(), 1);

    h.observer.stop().await;
}

#[tokio::test]
async fn malformed_did_message_is_dropped() {
    let graph = FakeGraph {
        did_anchors: vec![Anchor {
            cid: "hl:first".into(),
            info: credential("did:orb", 0, json!({"suffixB": ""})),
        }],
        ..Default::default()
    };

    let h = harness(graph, FakeOutbox::default(), ObserverConfig::default()).await;
    h.observer.start();

    let publisher = h.observer.publisher();
    publisher.publish_did("malformed").await.unwrap();
    publisher.publish_did("did:orb:cidhint:suffixB").await.unwrap();

    wait_for(|| h.metrics.snapshot().dids_processed >= 2).await;

    assert_eq!(h.index.get("suffixB").unwrap(), "hl:first");

    h.observer.stop().await;
}
