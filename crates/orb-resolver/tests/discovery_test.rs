use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orb_resolver::{Discovery, DocumentResolver, ResolutionResult, ResolveHandler};
use orb_types::OrbError;
use serde_json::json;

struct StaticResolver {
    known: &'static str,
    failure: OrbError,
}

#[async_trait]
impl DocumentResolver for StaticResolver {
    async fn resolve_document(&self, id: &str) -> Result<ResolutionResult, OrbError> {
        if id == self.known {
            return Ok(ResolutionResult {
                context: "https://w3id.org/did-resolution/v1".to_string(),
                did_document: json!({ "id": id }),
                did_document_metadata: json!({}),
            });
        }
        Err(self.failure.clone())
    }
}

#[derive(Default)]
struct RecordingDiscovery {
    requests: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Discovery for RecordingDiscovery {
    async fn request_discovery(&self, orb_suffix: &str) -> Result<(), OrbError> {
        self.requests.lock().unwrap().push(orb_suffix.to_string());
        if self.fail {
            return Err(OrbError::transient("webfinger unavailable"));
        }
        Ok(())
    }
}

fn handler(failure: OrbError, discovery: Arc<RecordingDiscovery>) -> ResolveHandler {
    ResolveHandler::new(
        "did:orb",
        vec!["did:orb-alias".to_string()],
        "uAAA",
        Arc::new(StaticResolver {
            known: "did:orb:uEiCid:EiKnown",
            failure,
        }),
        discovery,
    )
}

#[tokio::test]
async fn not_found_requests_discovery() {
    let discovery = Arc::new(RecordingDiscovery::default());
    let h = handler(OrbError::NotFound("unknown".into()), Arc::clone(&discovery));

    let err = h.resolve_document("did:orb:uEiCid:EiMissing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = h.resolve_document("did:orb-alias:uEiCid:EiOther").await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(
        *discovery.requests.lock().unwrap(),
        ["uEiCid:EiMissing", "uEiCid:EiOther"]
    );
}

#[tokio::test]
async fn unpublished_did_never_triggers_discovery() {
    let discovery = Arc::new(RecordingDiscovery::default());
    let h = handler(OrbError::NotFound("unknown".into()), Arc::clone(&discovery));

    h.resolve_document("did:orb:uAAA:EiUnpublished").await.unwrap_err();

    assert!(discovery.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn other_errors_and_bad_suffixes_skip_discovery() {
    let discovery = Arc::new(RecordingDiscovery::default());
    let h = handler(OrbError::transient("store down"), Arc::clone(&discovery));
    let err = h.resolve_document("did:orb:uEiCid:EiMissing").await.unwrap_err();
    assert!(err.is_transient());

    let h = handler(OrbError::NotFound("unknown".into()), Arc::clone(&discovery));
    h.resolve_document("did:orb:EiLongForm").await.unwrap_err();
    h.resolve_document("did:web:uEiCid:EiMissing").await.unwrap_err();

    assert!(discovery.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn discovery_failure_is_not_surfaced() {
    let discovery = Arc::new(RecordingDiscovery {
        fail: true,
        ..Default::default()
    });
    let h = handler(OrbError::NotFound("unknown".into()), Arc::clone(&discovery));

    let err = h.resolve_document("did:orb:uEiCid:EiMissing").await.unwrap_err();
    assert_eq!(err, OrbError::NotFound("unknown".into()));
    assert_eq!(discovery.requests.lock().unwrap().len(), 1);

    let found = h.resolve_document("did:orb:uEiCid:EiKnown").await.unwrap();
    assert_eq!(found.did_document["id"], "did:orb:uEiCid:EiKnown");
    assert_eq!(discovery.requests.lock().unwrap().len(), 1);
}
