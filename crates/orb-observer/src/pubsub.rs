//! Bridge between the broker and the anchor/DID handlers.
//!
//! Each topic gets its own consumption loop. A loop decodes a message,
//! calls the handler and settles the message from the outcome: transient
//! errors are nacked so the broker redelivers, everything else is acked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orb_types::{AnchorInfo, OrbError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::{Message, PubSub};

pub const ANCHOR_TOPIC: &str = "orb.anchor";
pub const DID_TOPIC: &str = "orb.did";

/// Producer-side capability handed out by the observer.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_anchor(&self, info: &AnchorInfo) -> Result<(), OrbError>;
    async fn publish_did(&self, did: &str) -> Result<(), OrbError>;
}

#[async_trait]
pub trait AnchorHandler: Send + Sync {
    async fn handle_anchor(&self, info: AnchorInfo) -> Result<(), OrbError>;
}

#[async_trait]
pub trait DidHandler: Send + Sync {
    async fn handle_did(&self, did: String) -> Result<(), OrbError>;
}

pub struct PubSubBridge {
    pubsub: Arc<dyn PubSub>,
    anchor_handler: Arc<dyn AnchorHandler>,
    did_handler: Arc<dyn DidHandler>,
    anchor_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    did_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PubSubBridge {
    /// Subscribes to both topics. Consumption begins with [`start`](Self::start).
    pub async fn new(
        pubsub: Arc<dyn PubSub>,
        anchor_handler: Arc<dyn AnchorHandler>,
        did_handler: Arc<dyn DidHandler>,
    ) -> Result<Self, OrbError> {
        let anchor_rx = pubsub
            .subscribe(ANCHOR_TOPIC)
            .await
            .map_err(|e| e.context(format!("subscribe to topic [{ANCHOR_TOPIC}]")))?;
        let did_rx = pubsub
            .subscribe(DID_TOPIC)
            .await
            .map_err(|e| e.context(format!("subscribe to topic [{DID_TOPIC}]")))?;

        Ok(Self {
            pubsub,
            anchor_handler,
            did_handler,
            anchor_rx: Mutex::new(Some(anchor_rx)),
            did_rx: Mutex::new(Some(did_rx)),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the two consumption loops. A second call has nothing left to
    /// consume and does nothing.
    pub fn start(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(rx) = take(&self.anchor_rx) {
            let handler = Arc::clone(&self.anchor_handler);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(consume(ANCHOR_TOPIC, rx, cancel, move |payload| {
                let handler = Arc::clone(&handler);
                async move {
                    let info: AnchorInfo = serde_json::from_slice(&payload)
                        .map_err(|e| OrbError::Invalid(format!("unmarshal anchor info: {e}")))?;
                    handler.handle_anchor(info).await
                }
            })));
        }

        if let Some(rx) = take(&self.did_rx) {
            let handler = Arc::clone(&self.did_handler);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(consume(DID_TOPIC, rx, cancel, move |payload| {
                let handler = Arc::clone(&handler);
                async move {
                    let did = String::from_utf8(payload)
                        .map_err(|e| OrbError::Invalid(format!("decode DID: {e}")))?;
                    handler.handle_did(did).await
                }
            })));
        }

        tracing::info!("pubsub bridge started");
    }

    /// Stops both loops and closes the broker.
    pub async fn stop(&self) {
        self.cancel.cancel();

        if let Err(e) = self.pubsub.close().await {
            tracing::warn!(error = %e, "error closing pubsub");
        }

        let tasks: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "consumer task ended abnormally");
            }
        }

        tracing::info!("pubsub bridge stopped");
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), OrbError> {
        self.pubsub
            .publish(topic, vec![Message::new(payload)])
            .await
            .map_err(|e| e.context(format!("publish to topic [{topic}]")))
    }
}

#[async_trait]
impl Publisher for PubSubBridge {
    async fn publish_anchor(&self, info: &AnchorInfo) -> Result<(), OrbError> {
        let payload = serde_json::to_vec(info)
            .map_err(|e| OrbError::Invalid(format!("marshal anchor info: {e}")))?;

        self.publish(ANCHOR_TOPIC, payload).await
    }

    async fn publish_did(&self, did: &str) -> Result<(), OrbError> {
        self.publish(DID_TOPIC, did.as_bytes().to_vec()).await
    }
}

fn take(slot: &Mutex<Option<mpsc::Receiver<Message>>>) -> Option<mpsc::Receiver<Message>> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

async fn consume<F, Fut>(
    topic: &'static str,
    mut rx: mpsc::Receiver<Message>,
    cancel: CancellationToken,
    handle: F,
) where
    F: Fn(Vec<u8>) -> Fut,
    Fut: std::future::Future<Output = Result<(), OrbError>>,
{
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(msg) => msg,
                None => break,
            },
        };

        let uuid = msg.uuid.clone();
        let result = handle(msg.payload.clone()).await;
        settle(topic, &uuid, msg, result);
    }

    tracing::debug!(topic, "consumer loop exited");
}

fn settle(topic: &str, uuid: &str, msg: Message, result: Result<(), OrbError>) {
    match result {
        Ok(()) => msg.ack(),
        Err(e) if e.is_transient() => {
            tracing::warn!(topic, uuid, error = %e, "transient error processing message, will retry");
            msg.nack();
        }
        Err(e) => {
            tracing::warn!(topic, uuid, error = %e, "error processing message, dropping");
            msg.ack();
        }
    }
}
