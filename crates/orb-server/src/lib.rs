//! Orb node library logic: configuration, HTTP surface and node wiring.

pub mod api;
pub mod config;
pub mod outbox;
pub mod protocol;
pub mod resolve;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use orb_db::DbPool;
use orb_graph::{Graph, HttpCasClient};
use orb_observer::{
    MemPubSub, Observer, Outbox, OutboxProvider, ProcessingMetrics, Providers, Publisher,
};
use orb_resolver::ResolveHandler;
use orb_store::{DidAnchorStore, TransactionLog};
use orb_types::OrbError;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::outbox::{HttpOutbox, LogOutbox};
use crate::protocol::{StaticProtocolProvider, TransactionLogProcessor};
use crate::resolve::{IndexResolver, PublisherDiscovery};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Queues anchors and DIDs for the observer.
    pub publisher: Arc<dyn Publisher>,
    pub metrics: Arc<ProcessingMetrics>,
    pub resolver: Arc<ResolveHandler>,
}

/// A wired node: the running observer and the state its HTTP surface uses.
pub struct Node {
    pub observer: Observer,
    pub state: AppState,
}

/// Wires stores, anchor graph, broker and observer from `config`. The
/// observer is returned unstarted.
///
/// # Errors
///
/// Returns `OrbError::Invalid` for unusable configuration values.
pub async fn build_node(config: &Config, pool: DbPool) -> Result<Node, OrbError> {
    let http = reqwest::Client::new();

    let cas_url = config.cas.base_url().map_err(OrbError::invalid)?;
    let graph = Graph::new(Arc::new(HttpCasClient::new(http.clone(), cas_url)));

    let outbox: Arc<dyn Outbox> = match config.outbox.endpoint().map_err(OrbError::invalid)? {
        Some(endpoint) => Arc::new(HttpOutbox::new(http, endpoint)),
        None => Arc::new(LogOutbox),
    };
    let outbox_provider: OutboxProvider = Arc::new(move || Arc::clone(&outbox));

    let processor = Arc::new(TransactionLogProcessor::new(TransactionLog::new(pool.clone())));
    let index = DidAnchorStore::new(pool);
    let metrics = Arc::new(ProcessingMetrics::new());

    let providers = Providers {
        protocol_client_provider: Arc::new(StaticProtocolProvider::new(
            &config.protocol.namespaces,
            processor,
        )),
        anchor_graph: Arc::new(graph),
        did_anchors: Arc::new(index.clone()),
        pubsub: Arc::new(MemPubSub::new(config.pubsub.broker_config())),
        metrics: Arc::clone(&metrics) as Arc<dyn orb_observer::Metrics>,
        outbox: outbox_provider,
    };

    let observer = Observer::new(providers, config.observer.observer_config()).await?;
    let publisher = observer.publisher();

    let resolver = ResolveHandler::new(
        config.resolver.namespace.clone(),
        config.resolver.aliases.clone(),
        config.resolver.unpublished_label.clone(),
        Arc::new(IndexResolver::new(index)),
        Arc::new(PublisherDiscovery::new(Arc::clone(&publisher))),
    );

    Ok(Node {
        observer,
        state: AppState {
            publisher,
            metrics,
            resolver: Arc::new(resolver),
        },
    })
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(api::metrics_handler))
        .route("/anchors", post(api::submit_anchor_handler))
        .route("/dids", post(api::submit_did_handler))
        .route("/identifiers/{id}", get(api::resolve_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
