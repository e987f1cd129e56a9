//! Content-addressable storage readers.

use async_trait::async_trait;
use orb_types::OrbError;
use url::Url;

use crate::error::GraphError;

/// Reads raw content by content address.
#[async_trait]
pub trait CasReader: Send + Sync {
    async fn read(&self, cid: &str) -> Result<Vec<u8>, OrbError>;
}

/// CAS reader over HTTP: `GET <base>/<cid>`.
#[derive(Debug, Clone)]
pub struct HttpCasClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCasClient {
    /// Creates a reader rooted at `base_url` (e.g. `https://orb.domain1.com/cas`).
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    async fn fetch(&self, cid: &str) -> Result<Vec<u8>, GraphError> {
        let url = Url::parse(&format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            cid
        ))?;

        tracing::debug!(%url, "reading content from CAS");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GraphError::NotFound(cid.to_string()));
        }
        if !status.is_success() {
            return Err(GraphError::Status {
                status,
                cid: cid.to_string(),
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl CasReader for HttpCasClient {
    async fn read(&self, cid: &str) -> Result<Vec<u8>, OrbError> {
        Ok(self.fetch(cid).await?)
    }
}
