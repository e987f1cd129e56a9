//! Topic-based message broker with acknowledgement semantics.
//!
//! [`PubSub`] is the contract the bridge consumes. [`MemPubSub`] is the
//! in-process implementation: each subscription gets an ordered dispatcher
//! that delivers one message at a time and waits for it to be acked or
//! nacked. A nacked message (or one dropped without an answer) is delivered
//! again after `redelivery_delay`, up to `max_redeliveries` times.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use orb_types::OrbError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// A message travelling through the broker.
#[derive(Debug)]
pub struct Message {
    pub uuid: String,
    pub payload: Vec<u8>,
    ack: Option<oneshot::Sender<bool>>,
}

impl Message {
    /// Creates an outgoing message with a fresh UUID.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            payload: payload.into(),
            ack: None,
        }
    }

    /// Creates a delivered message and the receiver for its outcome
    /// (`true` = ack).
    pub fn delivery(uuid: String, payload: Vec<u8>) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let msg = Self {
            uuid,
            payload,
            ack: Some(tx),
        };
        (msg, rx)
    }

    /// Confirms the message; it will not be delivered again.
    pub fn ack(mut self) {
        if let Some(tx) = self.ack.take() {
            let _ = tx.send(true);
        }
    }

    /// Rejects the message; the broker may deliver it again.
    pub fn nack(mut self) {
        if let Some(tx) = self.ack.take() {
            let _ = tx.send(false);
        }
    }
}

/// Topic-based publish/subscribe transport.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Subscribes to `topic`. The stream ends when the broker is closed.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Message>, OrbError>;

    async fn publish(&self, topic: &str, messages: Vec<Message>) -> Result<(), OrbError>;

    async fn close(&self) -> Result<(), OrbError>;
}

/// Tunables for [`MemPubSub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemPubSubConfig {
    /// Messages buffered per subscription before `publish` waits.
    pub buffer_size: usize,
    pub redelivery_delay: Duration,
    /// Redeliveries after the first attempt before a message is dropped.
    pub max_redeliveries: u32,
}

impl Default for MemPubSubConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            redelivery_delay: Duration::from_secs(1),
            max_redeliveries: 10,
        }
    }
}

struct Pending {
    uuid: String,
    payload: Vec<u8>,
}

/// In-memory [`PubSub`].
pub struct MemPubSub {
    config: MemPubSubConfig,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Pending>>>>,
    closed: CancellationToken,
}

impl MemPubSub {
    pub fn new(config: MemPubSubConfig) -> Self {
        Self {
            config,
            subscribers: Mutex::new(HashMap::new()),
            closed: CancellationToken::new(),
        }
    }
}

impl Default for MemPubSub {
    fn default() -> Self {
        Self::new(MemPubSubConfig::default())
    }
}

#[async_trait]
impl PubSub for MemPubSub {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Message>, OrbError> {
        if self.closed.is_cancelled() {
            return Err(OrbError::Other("pubsub is closed".to_string()));
        }

        let (queue_tx, queue_rx) = mpsc::channel(self.config.buffer_size.max(1));
        let (out_tx, out_rx) = mpsc::channel(1);

        self.subscribers
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(queue_tx);

        tokio::spawn(dispatch(
            topic.to_string(),
            queue_rx,
            out_tx,
            self.config,
            self.closed.clone(),
        ));

        tracing::debug!(topic, "subscribed");

        Ok(out_rx)
    }

    async fn publish(&self, topic: &str, messages: Vec<Message>) -> Result<(), OrbError> {
        if self.closed.is_cancelled() {
            return Err(OrbError::Other("pubsub is closed".to_string()));
        }

        let subscribers = self
            .subscribers
            .lock()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default();

        if subscribers.is_empty() {
            tracing::debug!(topic, count = messages.len(), "no subscribers, dropping messages");
            return Ok(());
        }

        for msg in messages {
            for sub in &subscribers {
                let pending = Pending {
                    uuid: msg.uuid.clone(),
                    payload: msg.payload.clone(),
                };
                if sub.send(pending).await.is_err() {
                    tracing::debug!(topic, uuid = %msg.uuid, "subscriber gone, skipping");
                }
            }
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), OrbError> {
        self.closed.cancel();
        self.subscribers.lock().await.clear();
        tracing::debug!("pubsub closed");
        Ok(())
    }
}

/// Delivers queued messages to one subscriber, in order, honouring acks.
async fn dispatch(
    topic: String,
    mut queue: mpsc::Receiver<Pending>,
    out: mpsc::Sender<Message>,
    config: MemPubSubConfig,
    closed: CancellationToken,
) {
    loop {
        let pending = tokio::select! {
            _ = closed.cancelled() => return,
            next = queue.recv() => match next {
                Some(pending) => pending,
                None => return,
            },
        };

        let mut redeliveries = 0;

        loop {
            let (msg, outcome) = Message::delivery(pending.uuid.clone(), pending.payload.clone());

            tokio::select! {
                _ = closed.cancelled() => return,
                sent = out.send(msg) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }

            let acked = tokio::select! {
                _ = closed.cancelled() => return,
                outcome = outcome => outcome.unwrap_or(false),
            };

            if acked {
                break;
            }

            if redeliveries >= config.max_redeliveries {
                tracing::warn!(
                    topic = %topic,
                    uuid = %pending.uuid,
                    redeliveries,
                    "redelivery limit reached, dropping message"
                );
                break;
            }

            redeliveries += 1;
            tracing::debug!(topic = %topic, uuid = %pending.uuid, redeliveries, "redelivering message");

            tokio::select! {
                _ = closed.cancelled() => return,
                _ = tokio::time::sleep(config.redelivery_delay) => {}
            }
        }
    }
}
