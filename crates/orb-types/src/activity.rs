//! The subset of the ActivityStreams vocabulary posted by the observer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
pub const ACTIVITY_ANCHORS_CONTEXT: &str = "https://w3id.org/activityanchors/v1";
/// Addressing an activity to this IRI makes it public.
pub const PUBLIC_IRI: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Activity types emitted by this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Like,
}

/// Points at an anchor by URL (normally a hashlink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Url,
}

impl AnchorReference {
    pub fn new(url: Url) -> Self {
        Self {
            kind: "AnchorReference".to_string(),
            url,
        }
    }
}

/// An activity destined for the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Url>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub object: AnchorReference,
    pub to: Vec<String>,
    pub published: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnchorReference>,
}

impl Activity {
    /// Builds a public `Like` of `anchor` addressed to its originator.
    ///
    /// `local` becomes the `result` when the anchor was also stored locally.
    pub fn like(anchor: Url, originator: Url, local: Option<Url>, published: DateTime<Utc>) -> Self {
        Self {
            context: vec![
                ACTIVITY_STREAMS_CONTEXT.to_string(),
                ACTIVITY_ANCHORS_CONTEXT.to_string(),
            ],
            id: None,
            kind: ActivityKind::Like,
            object: AnchorReference::new(anchor),
            to: vec![originator.to_string(), PUBLIC_IRI.to_string()],
            published,
            result: local.map(AnchorReference::new),
        }
    }
}
