//! Anchor observation for the Orb node.
//!
//! The observer receives anchor references and DIDs over a [`PubSub`]
//! broker, dereferences them through the anchor graph, feeds the anchored
//! transactions to the matching protocol version and keeps the
//! DID-to-anchor index current. Anchors with an originator are acknowledged
//! with a `Like` activity.
//!
//! Handler errors are settled by classification only: a transient
//! [`orb_types::OrbError`] nacks the message so the broker redelivers it,
//! anything else acks it.

pub mod broker;
pub mod metrics;
pub mod observer;
pub mod providers;
pub mod pubsub;

pub use broker::{MemPubSub, MemPubSubConfig, Message, PubSub};
pub use metrics::{MetricsSnapshot, ProcessingMetrics};
pub use observer::{Observer, ObserverConfig};
pub use providers::{
    DidAnchors, Metrics, Outbox, OutboxProvider, ProtocolClient, ProtocolClientProvider,
    ProtocolVersion, Providers, TransactionProcessor,
};
pub use pubsub::{AnchorHandler, DidHandler, PubSubBridge, Publisher, ANCHOR_TOPIC, DID_TOPIC};
