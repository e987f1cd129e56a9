//! Outbox clients for acknowledgement activities.

use async_trait::async_trait;
use orb_observer::Outbox;
use orb_types::{Activity, OrbError};
use serde::Deserialize;
use url::Url;

/// Posts activities to a remote ActivityPub outbox as JSON.
#[derive(Debug, Clone)]
pub struct HttpOutbox {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Deserialize)]
struct PostResponse {
    id: Url,
}

impl HttpOutbox {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Outbox for HttpOutbox {
    async fn post(&self, activity: &Activity) -> Result<Url, OrbError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(activity)
            .send()
            .await
            .map_err(|e| OrbError::Transient(format!("post to outbox: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let err = format!("outbox returned {status}");
            return Err(if status.is_server_error() {
                OrbError::Transient(err)
            } else {
                OrbError::Other(err)
            });
        }

        let body: PostResponse = resp
            .json()
            .await
            .map_err(|e| OrbError::Other(format!("decode outbox response: {e}")))?;

        Ok(body.id)
    }
}

/// Stand-in used when no outbox is configured: logs the activity and
/// assigns it a `urn:uuid` ID.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutbox;

#[async_trait]
impl Outbox for LogOutbox {
    async fn post(&self, activity: &Activity) -> Result<Url, OrbError> {
        let id = Url::parse(&format!("urn:uuid:{}", uuid::Uuid::new_v4()))
            .map_err(|e| OrbError::Other(format!("activity ID: {e}")))?;

        tracing::info!(
            activity = %id,
            object = %activity.object.url,
            to = ?activity.to,
            "no outbox configured, dropping Like activity"
        );

        Ok(id)
    }
}
